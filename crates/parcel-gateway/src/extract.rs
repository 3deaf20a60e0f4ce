use crate::error::AppError;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, FromRequest, FromRequestParts, Multipart, Request};
use axum::http::header::{CONTENT_TYPE, REFERER, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use parcel_core::RequestMeta;
use std::convert::Infallible;
use std::net::SocketAddr;

/// Client details recorded with every view, download and click.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta(pub RequestMeta);

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(ClientMeta(RequestMeta {
            ip: client_ip(&parts.headers).or(peer),
            user_agent: header(&parts.headers, USER_AGENT.as_str()),
            referrer: header(&parts.headers, REFERER.as_str()),
        }))
    }
}

/// The body of `POST /v1/uploads`.
///
/// Either the raw file, typed by the request's `Content-Type`, or a
/// `multipart/form-data` form with a `file` part and an optional
/// `thumbnail` part. Other form parts are ignored.
#[derive(Debug, Default)]
pub struct UploadBody {
    pub data: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub thumbnail: Option<Bytes>,
}

impl<S> FromRequest<S> for UploadBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = header(req.headers(), CONTENT_TYPE.as_str());
        if !content_type
            .as_deref()
            .is_some_and(|value| value.starts_with("multipart/form-data"))
        {
            let data = Bytes::from_request(req, state).await?;
            return Ok(UploadBody {
                data,
                content_type,
                ..UploadBody::default()
            });
        }

        let mut form = Multipart::from_request(req, state).await?;
        let mut body = UploadBody::default();
        let mut file = None;
        while let Some(field) = form.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("file") => {
                    body.file_name = field.file_name().map(str::to_string);
                    body.content_type = field.content_type().map(str::to_string);
                    file = Some(field.bytes().await?);
                }
                Some("thumbnail") => body.thumbnail = Some(field.bytes().await?),
                _ => {}
            }
        }

        body.data =
            file.ok_or_else(|| AppError::BadRequest("form has no `file` part".to_string()))?;
        Ok(body)
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = header(headers, "x-forwarded-for")
        .and_then(|chain| chain.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty());
    forwarded.or_else(|| header(headers, "x-real-ip"))
}
