use async_trait::async_trait;
use huddle_interface::{
    interface::{Transport, TransportError},
    types::{HttpRequest, HttpResponse, Method},
};
use surf::http::Method as SurfMethod;

/// [`Transport`] backed by a surf client. No timeout is configured, a call
/// lasts until the connection resolves or errors.
#[derive(Debug, Clone, Default)]
pub struct SurfTransport {
    client: surf::Client,
}

impl SurfTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

fn surf_method(method: Method) -> SurfMethod {
    match method {
        Method::Get => SurfMethod::Get,
        Method::Post => SurfMethod::Post,
        Method::Put => SurfMethod::Put,
        Method::Patch => SurfMethod::Patch,
        Method::Delete => SurfMethod::Delete,
    }
}

#[async_trait]
impl Transport for SurfTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut req = self
            .client
            .request(surf_method(request.method), request.url.as_str());
        // Body first, the headers below carry the real content type
        if let Some(body) = request.body {
            req = req.body(body);
        }
        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let mut res = req
            .send()
            .await
            .map_err(|err| TransportError::new(err.to_string()))?;
        let status = u16::from(res.status());
        // Raw bytes, a charset the server got wrong must not hide the status
        let body = res
            .body_bytes()
            .await
            .map_err(|err| TransportError::new(err.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}
