//! HTTP client for the event service

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;

use super::dto::{
    Credentials, EnrolledEvent, Event, EventFields, ImageUpload, LoginResponse, MessageBody,
    SignupForm,
};
use super::EventApi;
use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};

/// [`EventApi`] over HTTP with `reqwest`
#[derive(Debug, Clone)]
pub struct HttpEventApi {
    client: Client,
    base_url: String,
}

impl HttpEventApi {
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn event_url(&self, id: &str) -> String {
        self.url(&format!("/api/events/{}", urlencoding::encode(id)))
    }

    async fn send(&self, request: RequestBuilder, authenticated: bool) -> ClientResult<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Network("request timed out".to_string())
            } else {
                ClientError::from(e)
            }
        })?;
        check_status(response, authenticated).await
    }

    async fn send_event_form(
        &self,
        request: RequestBuilder,
        fields: &EventFields,
        image: Option<&ImageUpload>,
    ) -> ClientResult<Option<Event>> {
        let form = build_form(fields, image)?;
        let response = self.send(request.multipart(form), true).await?;

        let body = response.bytes().await?;
        match serde_json::from_slice::<Event>(&body) {
            Ok(event) => Ok(Some(event)),
            Err(e) => {
                tracing::debug!(error = %e, "Event submission returned a non-event body");
                Ok(None)
            }
        }
    }

    async fn acknowledge(&self, response: Response) -> ClientResult<String> {
        let body: MessageBody = response.json().await.unwrap_or_default();
        Ok(body.text().unwrap_or_default().to_string())
    }
}

/// Turn non-2xx responses into errors
///
/// 401/403 on a bearer request means the token is no good and maps to
/// [`ClientError::Auth`]; everything else becomes a server rejection carrying
/// the body's message.
async fn check_status(response: Response, authenticated: bool) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MessageBody>(&text)
        .ok()
        .and_then(|b| b.text().map(str::to_string))
        .or_else(|| Some(text.trim().to_string()).filter(|t| !t.is_empty()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    if authenticated && matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(ClientError::Auth(message));
    }

    Err(ClientError::ServerRejection {
        status: status.as_u16(),
        message,
    })
}

fn build_form(fields: &EventFields, image: Option<&ImageUpload>) -> ClientResult<Form> {
    let mut form = Form::new();
    for (name, value) in fields.form_pairs() {
        form = form.text(name, value);
    }

    if let Some(image) = image {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime)
            .map_err(|e| ClientError::Validation(format!("invalid image type: {}", e)))?;
        form = form.part("image", part);
    }

    Ok(form)
}

#[async_trait]
impl EventApi for HttpEventApi {
    async fn list_events(&self) -> ClientResult<Vec<Event>> {
        let response = self.send(self.client.get(self.url("/api/events")), false).await?;
        Ok(response.json().await?)
    }

    async fn get_event(&self, id: &str) -> ClientResult<Event> {
        let response = self.send(self.client.get(self.event_url(id)), false).await?;
        Ok(response.json().await?)
    }

    async fn create_event(
        &self,
        token: &str,
        fields: &EventFields,
        image: Option<&ImageUpload>,
    ) -> ClientResult<Option<Event>> {
        let request = self.client.post(self.url("/api/events")).bearer_auth(token);
        self.send_event_form(request, fields, image).await
    }

    async fn update_event(
        &self,
        token: &str,
        id: &str,
        fields: &EventFields,
        image: Option<&ImageUpload>,
    ) -> ClientResult<Option<Event>> {
        let request = self.client.put(self.event_url(id)).bearer_auth(token);
        self.send_event_form(request, fields, image).await
    }

    async fn delete_event(&self, token: &str, id: &str) -> ClientResult<()> {
        self.send(self.client.delete(self.event_url(id)).bearer_auth(token), true)
            .await?;
        Ok(())
    }

    async fn join_event(&self, token: &str, id: &str) -> ClientResult<()> {
        let url = self.url(&format!("/api/{}/join", urlencoding::encode(id)));
        self.send(self.client.post(url).bearer_auth(token), true).await?;
        Ok(())
    }

    async fn withdraw_event(&self, token: &str, id: &str) -> ClientResult<()> {
        let url = self.url(&format!("/api/{}/withdraw", urlencoding::encode(id)));
        self.send(self.client.post(url).bearer_auth(token), true).await?;
        Ok(())
    }

    async fn enrolled_events(&self, token: &str) -> ClientResult<Vec<String>> {
        let request = self.client.get(self.url("/api/user/events")).bearer_auth(token);
        let response = self.send(request, true).await?;
        let enrolled: Vec<EnrolledEvent> = response.json().await?;
        Ok(enrolled.into_iter().map(|e| e.id).collect())
    }

    async fn login(&self, credentials: &Credentials) -> ClientResult<LoginResponse> {
        let request = self.client.post(self.url("/login")).json(credentials);
        let response = self.send(request, false).await?;
        Ok(response.json().await?)
    }

    async fn signup(&self, form: &SignupForm) -> ClientResult<String> {
        let response = self
            .send(self.client.post(self.url("/signup")).json(form), false)
            .await?;
        self.acknowledge(response).await
    }

    async fn guest_signup(&self, form: &SignupForm) -> ClientResult<String> {
        let response = self
            .send(self.client.post(self.url("/guestsignup")).json(form), false)
            .await?;
        self.acknowledge(response).await
    }
}
