//! Blocking HTTP transport over `reqwest`.

use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;

use crate::config::HttpConfig;
use crate::error::{HookError, Result};
use crate::model::attachment::DEFAULT_CONTENT_TYPE;
use crate::model::notification::WebhookPayload;

use super::{OutboundFile, Transport, TransportResponse};

/// Posts webhook payloads, as JSON or as `multipart/form-data`.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout((config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs)))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| HookError::Config(format!("invalid [http] settings: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        url: &str,
        payload: &WebhookPayload,
        files: Option<&[OutboundFile<'_>]>,
    ) -> Result<TransportResponse> {
        let request = self.client.post(url);
        let request = match files {
            None => request.json(payload),
            Some(files) => request.multipart(multipart_form(payload, files)?),
        };

        let response = request.send()?;
        let status = response.status().as_u16();
        let body = response.text().ok().filter(|b| !b.is_empty());

        tracing::debug!(status, "Webhook responded");
        Ok(TransportResponse { status, body })
    }
}

/// `payload_json` first, then one `files[i]` part per file.
fn multipart_form(payload: &WebhookPayload, files: &[OutboundFile<'_>]) -> Result<Form> {
    let mut form = Form::new().text("payload_json", serde_json::to_string(payload)?);

    for (i, file) in files.iter().enumerate() {
        form = form.part(format!("files[{i}]"), file_part(file));
    }
    Ok(form)
}

fn file_part(file: &OutboundFile<'_>) -> Part {
    let part = || Part::bytes(file.bytes.to_vec()).file_name(file.filename.to_string());
    // Unparseable media types still upload, as octet-stream.
    part()
        .mime_str(file.content_type)
        .or_else(|_| part().mime_str(DEFAULT_CONTENT_TYPE))
        .unwrap_or_else(|_| part())
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;

    fn payload() -> WebhookPayload {
        WebhookPayload {
            username: Some("Mailhook".to_string()),
            avatar_url: None,
            embeds: Vec::new(),
            attachments: Vec::new(),
        }
    }

    fn transport() -> HttpTransport {
        HttpTransport::new(&HttpConfig::default()).unwrap()
    }

    #[test]
    fn test_client_builds() {
        assert!(HttpTransport::new(&HttpConfig::default()).is_ok());
    }

    #[test]
    fn test_json_only_request() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/hook")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "username": "Mailhook",
                "embeds": []
            })))
            .with_status(204)
            .expect(1)
            .create();

        let url = format!("{}/hook", server.url());
        let response = transport().send(&url, &payload(), None).unwrap();

        mock.assert();
        assert_eq!(response, TransportResponse { status: 204, body: None });
    }

    #[test]
    fn test_multipart_request_shape() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/hook")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="payload_json"\r\n\r\n\{"username":"Mailhook""#.to_string()),
                Matcher::Regex(
                    r#"name="files\[0\]"; filename="email.txt"\r\nContent-Type: text/plain; charset=utf-8\r\n"#
                        .to_string(),
                ),
                Matcher::Regex(
                    r#"name="files\[1\]"; filename="weird.bin"\r\nContent-Type: application/octet-stream\r\n"#
                        .to_string(),
                ),
                Matcher::Regex(r#"(?s)payload_json.*files\[0\].*files\[1\]"#.to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"id":"1"}"#)
            .expect(1)
            .create();

        let files = [
            OutboundFile {
                filename: "email.txt",
                content_type: "text/plain; charset=utf-8",
                bytes: b"hello",
            },
            OutboundFile {
                filename: "weird.bin",
                content_type: "not a media type",
                bytes: b"\x00\x01",
            },
        ];
        let url = format!("{}/hook", server.url());
        let response = transport().send(&url, &payload(), Some(&files)).unwrap();

        mock.assert();
        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_deref(), Some(r#"{"id":"1"}"#));
    }

    #[test]
    fn test_rejection_keeps_status_and_body() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/hook")
            .with_status(413)
            .with_body(r#"{"message":"Request entity too large"}"#)
            .expect(1)
            .create();

        let files = [OutboundFile {
            filename: "big.bin",
            content_type: "application/octet-stream",
            bytes: b"data",
        }];
        let url = format!("{}/hook", server.url());
        let response = transport().send(&url, &payload(), Some(&files)).unwrap();

        mock.assert();
        assert_eq!(
            response,
            TransportResponse {
                status: 413,
                body: Some(r#"{"message":"Request entity too large"}"#.to_string()),
            }
        );
        assert!(!response.is_success());
    }

    #[test]
    fn test_unreachable_host_is_transport_error() {
        let result = transport().send("http://127.0.0.1:1/hook", &payload(), None);
        assert!(matches!(result, Err(HookError::Transport(_))));
    }
}
