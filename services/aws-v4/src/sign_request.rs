use crate::constants::{
    AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET, EXECUTE_API, X_AMZ_CONTENT_SHA_256, X_AMZ_DATE,
    X_AMZ_SECURITY_TOKEN,
};
use crate::Credential;
use http::{header, HeaderValue};
use log::debug;
use percent_encoding::utf8_percent_encode;
use reqgate_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use reqgate_core::time::{format_date, format_iso8601, now, DateTime};
use reqgate_core::{Context, Error, Result, SignRequest, SignedRequest};
use std::fmt::Write;

/// RequestSigner that implement AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
///
/// The payload is always signed: `x-amz-content-sha256` carries the digest of
/// the buffered content, or of the empty string for requests without one.
#[derive(Debug)]
pub struct RequestSigner {
    service: String,
    region: String,

    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer for `service` in `region`.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.into(),
            region: region.into(),

            time: None,
        }
    }

    /// Create a new signer for API Gateway endpoints in `region`.
    pub fn execute_api(region: &str) -> Self {
        Self::new(EXECUTE_API, region)
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

impl SignRequest for RequestSigner {
    type Credential = Credential;

    fn sign_request(
        &self,
        _: &Context,
        req: &mut SignedRequest,
        cred: &Self::Credential,
    ) -> Result<()> {
        let now = self.time.unwrap_or_else(now);

        // canonicalize context
        canonicalize_header(req, cred, now)?;
        let query = canonicalize_query(req);

        // build canonical request and string to sign.
        let creq = canonical_request_string(req, &query)?;
        let encoded_req = hex_sha256(creq.as_bytes());

        // Scope: "20220313/<region>/<service>/aws4_request"
        let scope = format!(
            "{}/{}/{}/aws4_request",
            format_date(now),
            self.region,
            self.service
        );
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "AWS4-HMAC-SHA256")?;
            writeln!(f, "{}", format_iso8601(now))?;
            writeln!(f, "{}", &scope)?;
            write!(f, "{}", &encoded_req)?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key =
            generate_signing_key(&cred.secret_access_key, now, &self.region, &self.service);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let mut authorization = HeaderValue::from_str(&format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            cred.access_key_id,
            scope,
            req.header_name_to_vec_sorted().join(";"),
            signature
        ))
        .map_err(|e| {
            Error::request_invalid("failed to create authorization header").with_source(e)
        })?;
        authorization.set_sensitive(true);

        req.headers.insert(header::AUTHORIZATION, authorization);
        Ok(())
    }
}

fn canonical_request_string(req: &SignedRequest, query: &[(String, String)]) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    // Insert method
    writeln!(f, "{}", req.method)?;
    // Insert encoded path. The path is already encoded, so encoding it once
    // more yields the double encoding non-S3 services expect.
    let path = if req.path.starts_with('/') {
        req.path.clone()
    } else {
        format!("/{}", req.path)
    };
    writeln!(f, "{}", utf8_percent_encode(&path, &AWS_URI_ENCODE_SET))?;
    // Insert query
    writeln!(
        f,
        "{}",
        query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    )?;
    // Insert signed headers
    let signed_headers = req.header_name_to_vec_sorted();
    for header in signed_headers.iter() {
        let values = req
            .headers
            .get_all(*header)
            .iter()
            .map(|v| v.to_str())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        writeln!(f, "{}:{}", header, values.join(","))?;
    }
    writeln!(f)?;
    writeln!(f, "{}", signed_headers.join(";"))?;
    let digest = header::HeaderName::from_static(X_AMZ_CONTENT_SHA_256);
    write!(f, "{}", req.header_get_or_default(&digest)?)?;

    debug!("calculated canonical request: {f}");
    Ok(f)
}

fn canonicalize_header(req: &mut SignedRequest, cred: &Credential, now: DateTime) -> Result<()> {
    // Header names and values need to be normalized according to Step 4 of https://docs.aws.amazon.com/general/latest/gr/sigv4-create-canonical-request.html
    for (_, value) in req.headers.iter_mut() {
        SignedRequest::header_value_normalize(value)
    }

    // Insert HOST header if not present.
    if req.headers.get(header::HOST).is_none() {
        let authority = req.authority();
        req.headers.insert(header::HOST, authority.parse()?);
    }

    // Insert DATE header if not present.
    if req.headers.get(X_AMZ_DATE).is_none() {
        req.headers
            .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);
    }

    // The payload is always buffered, so its digest is always known.
    let digest = hex_sha256(
        req.content()
            .map(|c| c.bytes().as_ref())
            .unwrap_or_default(),
    );
    req.headers
        .insert(X_AMZ_CONTENT_SHA_256, HeaderValue::try_from(digest)?);

    // Insert X_AMZ_SECURITY_TOKEN header if security token exists.
    if let Some(token) = &cred.session_token {
        let mut value = HeaderValue::from_str(token)?;
        // Set token value sensitive to valid leaking.
        value.set_sensitive(true);

        req.headers.insert(X_AMZ_SECURITY_TOKEN, value);
    }

    Ok(())
}

/// Encode every query pair and sort them, leaving the request untouched.
fn canonicalize_query(req: &SignedRequest) -> Vec<(String, String)> {
    let mut query = req
        .query_pairs()
        .into_iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect::<Vec<_>>();
    query.sort();
    query
}

fn generate_signing_key(secret: &str, time: DateTime, region: &str, service: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}
