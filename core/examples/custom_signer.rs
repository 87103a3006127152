use std::collections::HashMap;

use reqgate_core::hash::{hex_hmac_sha256, hex_sha256};
use reqgate_core::time::{format_iso8601, now};
use reqgate_core::{
    ApiRequest, Context, ProvideCredential, Result, SignRequest, SignedRequest,
    SignedRequestFactory, Signer, SigningCredential, StaticEnv,
};

// Define a custom credential type
#[derive(Clone, Debug)]
struct MyCredential {
    api_key: String,
    api_secret: String,
}

impl SigningCredential for MyCredential {
    fn is_valid(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

// Implement a credential loader that loads from environment
#[derive(Debug)]
struct MyCredentialLoader;

impl ProvideCredential for MyCredentialLoader {
    type Credential = MyCredential;

    fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let (Some(api_key), Some(api_secret)) =
            (ctx.env_var("MY_API_KEY"), ctx.env_var("MY_API_SECRET"))
        else {
            return Ok(None);
        };

        Ok(Some(MyCredential {
            api_key,
            api_secret,
        }))
    }
}

// Implement a request signer computing an HMAC over method, path, time and payload
#[derive(Debug)]
struct MyRequestSigner;

impl SignRequest for MyRequestSigner {
    type Credential = MyCredential;

    fn sign_request(
        &self,
        _: &Context,
        req: &mut SignedRequest,
        cred: &Self::Credential,
    ) -> Result<()> {
        let timestamp = format_iso8601(now());
        let digest = hex_sha256(
            req.content()
                .map(|c| c.bytes().as_ref())
                .unwrap_or_default(),
        );

        let string_to_sign = format!("{}\n{}\n{timestamp}\n{digest}", req.method, req.path);
        let signature = hex_hmac_sha256(cred.api_secret.as_bytes(), string_to_sign.as_bytes());

        req.headers.insert("x-timestamp", timestamp.parse()?);
        let mut authorization: http::HeaderValue =
            format!("MyAuth {}:{signature}", cred.api_key).parse()?;
        authorization.set_sensitive(true);
        req.headers.insert(http::header::AUTHORIZATION, authorization);
        Ok(())
    }
}

fn main() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    // Use a static environment so the example runs anywhere.
    let ctx = Context::new().with_env(StaticEnv {
        envs: HashMap::from([
            ("MY_API_KEY".to_string(), "demo-api-key".to_string()),
            ("MY_API_SECRET".to_string(), "demo-api-secret".to_string()),
        ]),
    });
    let factory =
        SignedRequestFactory::new(Signer::new(ctx, MyCredentialLoader, MyRequestSigner));

    let req = ApiRequest::builder_from_url("https://api.example.com/v1/items?id=123")?
        .set_method("PUT")?
        .set_api_key("my-gateway-key")
        .set_json_payload(&serde_json::json!({"name": "apple"}))?
        .build();
    println!("request: {req:?}");

    let signed = factory.create(&req)?;
    println!("signed {} {}", signed.method, signed.uri()?);
    for (name, value) in &signed.headers {
        println!("  {name}: {value:?}");
    }
    Ok(())
}
