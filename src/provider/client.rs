use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::{Credential, DatabaseUserSpec, IpAccessListSpec};
use crate::provider::error::{classify, ApiErrorBody, ProviderError};
use crate::provider::types::{Cluster, Project, ProjectInput};

/// Thin REST binding to the provider's control-plane API. Pure
/// request/response mapping: no retries, no caching, transport-default
/// timeouts.
#[derive(Debug, Clone)]
pub struct AtlasClient {
    http: Client,
    base_url: String,
    credential: Credential,
}

impl AtlasClient {
    pub fn new(base_url: &str, credential: Credential) -> Self {
        Self {
            http: Client::new(),
            base_url: format!("{}/api/atlas/v1.0", base_url.trim_end_matches('/')),
            credential,
        }
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(
            &self.credential.public_key,
            Some(&self.credential.private_key),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn handle<T: DeserializeOwned>(&self, response: Response) -> Result<T, ProviderError> {
        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(response.json::<T>().await?);
        }
        let body = response.json::<ApiErrorBody>().await.unwrap_or_default();
        Err(classify(status, body))
    }

    async fn handle_empty(&self, response: Response) -> Result<(), ProviderError> {
        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(());
        }
        let body = response.json::<ApiErrorBody>().await.unwrap_or_default();
        Err(classify(status, body))
    }

    pub async fn create_project(&self, input: &ProjectInput) -> Result<Project, ProviderError> {
        let response = self
            .authed(self.http.post(self.url("/groups")))
            .json(input)
            .send()
            .await?;
        self.handle(response).await
    }

    pub async fn get_project_by_name(&self, name: &str) -> Result<Project, ProviderError> {
        let response = self
            .authed(self.http.get(self.url(&format!("/groups/byName/{}", name))))
            .send()
            .await?;
        self.handle(response).await
    }

    pub async fn create_cluster(
        &self,
        group_id: &str,
        body: &Value,
    ) -> Result<Cluster, ProviderError> {
        let response = self
            .authed(
                self.http
                    .post(self.url(&format!("/groups/{}/clusters", group_id))),
            )
            .json(body)
            .send()
            .await?;
        self.handle(response).await
    }

    pub async fn get_cluster(&self, group_id: &str, name: &str) -> Result<Cluster, ProviderError> {
        let response = self
            .authed(
                self.http
                    .get(self.url(&format!("/groups/{}/clusters/{}", group_id, name))),
            )
            .send()
            .await?;
        self.handle(response).await
    }

    pub async fn update_cluster(
        &self,
        group_id: &str,
        name: &str,
        body: &Value,
    ) -> Result<Cluster, ProviderError> {
        let response = self
            .authed(
                self.http
                    .patch(self.url(&format!("/groups/{}/clusters/{}", group_id, name))),
            )
            .json(body)
            .send()
            .await?;
        self.handle(response).await
    }

    pub async fn delete_cluster(&self, group_id: &str, name: &str) -> Result<(), ProviderError> {
        let response = self
            .authed(
                self.http
                    .delete(self.url(&format!("/groups/{}/clusters/{}", group_id, name))),
            )
            .send()
            .await?;
        self.handle_empty(response).await
    }

    pub async fn create_database_user(
        &self,
        group_id: &str,
        user: &DatabaseUserSpec,
    ) -> Result<(), ProviderError> {
        let response = self
            .authed(
                self.http
                    .post(self.url(&format!("/groups/{}/databaseUsers", group_id))),
            )
            .json(user)
            .send()
            .await?;
        self.handle_empty(response).await
    }

    pub async fn delete_database_user(
        &self,
        group_id: &str,
        database: &str,
        username: &str,
    ) -> Result<(), ProviderError> {
        let response = self
            .authed(self.http.delete(self.url(&format!(
                "/groups/{}/databaseUsers/{}/{}",
                group_id, database, username
            ))))
            .send()
            .await?;
        self.handle_empty(response).await
    }

    pub async fn create_ip_access_list(
        &self,
        group_id: &str,
        rules: &[IpAccessListSpec],
    ) -> Result<(), ProviderError> {
        let response = self
            .authed(
                self.http
                    .post(self.url(&format!("/groups/{}/accessList", group_id))),
            )
            .json(rules)
            .send()
            .await?;
        self.handle_empty(response).await
    }

    pub async fn add_project_user(
        &self,
        group_id: &str,
        username: &str,
        roles: &[String],
    ) -> Result<(), ProviderError> {
        let body = serde_json::json!({
            "username": username,
            "roles": roles,
        });
        let response = self
            .authed(
                self.http
                    .post(self.url(&format!("/groups/{}/users", group_id))),
            )
            .json(&body)
            .send()
            .await?;
        self.handle_empty(response).await
    }

    pub async fn remove_project_user(
        &self,
        group_id: &str,
        username: &str,
    ) -> Result<(), ProviderError> {
        let response = self
            .authed(
                self.http
                    .delete(self.url(&format!("/groups/{}/users/{}", group_id, username))),
            )
            .send()
            .await?;
        self.handle_empty(response).await
    }
}
