use crate::{
    api::{
        ErrorResponse, GenerateTagRequest, GenerateTagResponse, RunForgeryRequest,
        RunForgeryResponse, StatusResponse, TagRequest, TagResponse, VerifyTagRequest,
        VerifyTagResponse,
    },
    ClientError, SessionId,
};

use reqwest::Response;
use serde::{de::DeserializeOwned, Serialize};

/// Talks to a running MAC service.
#[derive(Debug, Clone)]
pub struct MacClient {
    address: String,
    http: reqwest::Client,
}

impl MacClient {
    /// `address` is the service's base URL, e.g. `http://127.0.0.1:5000`.
    pub fn new(address: &str) -> Self {
        Self {
            address: address.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        let response = self.http.get(self.url("/")).send().await?;
        parse(response).await
    }

    /// Start a session. Empty `message` or `key` are generated by the
    /// service.
    pub async fn generate_tag(
        &self,
        message: &str,
        key: &str,
    ) -> Result<GenerateTagResponse, ClientError> {
        let request = GenerateTagRequest {
            message: message.to_string(),
            key: key.to_string(),
        };
        self.post("/generate-tag", &request).await
    }

    pub async fn tag(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> Result<TagResponse, ClientError> {
        let request = TagRequest {
            session_id: session_id.clone(),
            message: message.to_string(),
        };
        self.post("/tag", &request).await
    }

    pub async fn verify_tag(
        &self,
        message: &str,
        key: &str,
        tag: &str,
    ) -> Result<VerifyTagResponse, ClientError> {
        let request = VerifyTagRequest {
            message: message.to_string(),
            key: key.to_string(),
            tag: tag.to_string(),
        };
        self.post("/verify-tag", &request).await
    }

    pub async fn run_forgery(
        &self,
        session_id: &SessionId,
    ) -> Result<RunForgeryResponse, ClientError> {
        let request = RunForgeryRequest {
            session_id: session_id.clone(),
        };
        self.post("/run-forgery", &request).await
    }

    pub async fn discard_session(&self, session_id: &SessionId) -> Result<(), ClientError> {
        let uri = self.url(&format!("/sessions/{}", session_id));
        let response = self.http.delete(uri).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(api_error(response).await)
        }
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp, ClientError> {
        let response = self.http.post(self.url(path)).json(request).send().await?;
        parse(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    if response.status().is_success() {
        Ok(response.json::<T>().await?)
    } else {
        Err(api_error(response).await)
    }
}

async fn api_error(response: Response) -> ClientError {
    let status = response.status().as_u16();
    // Rejections from axum itself, e.g. a malformed body, aren't JSON.
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(e) => e.to_string(),
    };
    ClientError::Api { status, message }
}
