use std::marker::PhantomData;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use ureq::http::{Response, StatusCode};
use ureq::{Agent, Body};

use super::CollectionService;
use crate::error::ApiError;
use crate::model::{Order, OrderDraft, Product, ProductDraft, RecordId, User, UserDraft};

pub const USERS: &str = "usuario";
pub const PRODUCTS: &str = "producto";
pub const ORDERS: &str = "orden";

/// 接口配置，在启动时构造一次后注入
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// 接口客户端，为每个集合创建对应的服务
#[derive(Clone)]
pub struct ApiClient {
    agent: Agent,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Self {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: Agent::new_with_config(agent_config),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn users(&self) -> HttpCollection<User, UserDraft> {
        self.collection(USERS)
    }

    pub fn products(&self) -> HttpCollection<Product, ProductDraft> {
        self.collection(PRODUCTS)
    }

    pub fn orders(&self) -> HttpCollection<Order, OrderDraft> {
        self.collection(ORDERS)
    }

    fn collection<I, D>(&self, name: &'static str) -> HttpCollection<I, D> {
        HttpCollection {
            agent: self.agent.clone(),
            base_url: self.base_url.clone(),
            collection: name,
            _marker: PhantomData,
        }
    }
}

/// 基于 HTTP + JSON 的集合服务
pub struct HttpCollection<I, D> {
    agent: Agent,
    base_url: String,
    collection: &'static str,
    _marker: PhantomData<fn() -> (I, D)>,
}

impl<I, D> HttpCollection<I, D> {
    pub fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.collection)
    }

    pub fn item_url(&self, id: RecordId) -> String {
        format!("{}/{}/{}", self.base_url, self.collection, id)
    }

    fn transport(&self, op: &'static str, err: ureq::Error) -> ApiError {
        ApiError::Transport {
            op,
            collection: self.collection,
            message: err.to_string(),
        }
    }

    fn check_status(&self, op: &'static str, status: StatusCode) -> Result<(), ApiError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status {
                op,
                collection: self.collection,
                status: status.as_u16(),
            })
        }
    }

    fn read_json<T: DeserializeOwned>(
        &self,
        op: &'static str,
        mut response: Response<Body>,
    ) -> Result<T, ApiError> {
        self.check_status(op, response.status())?;

        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| self.transport(op, e))?;

        serde_json::from_str(&text).map_err(|e| ApiError::Decode {
            op,
            collection: self.collection,
            message: e.to_string(),
        })
    }

    fn encode<T: Serialize>(&self, op: &'static str, body: &T) -> Result<Vec<u8>, ApiError> {
        serde_json::to_vec(body).map_err(|e| ApiError::Decode {
            op,
            collection: self.collection,
            message: format!("请求体序列化失败: {}", e),
        })
    }
}

impl<I, D> CollectionService for HttpCollection<I, D>
where
    I: DeserializeOwned,
    D: Serialize,
{
    type Item = I;
    type Draft = D;

    fn collection(&self) -> &'static str {
        self.collection
    }

    fn list(&self) -> Result<Vec<I>, ApiError> {
        let url = self.collection_url();
        tracing::debug!(target: "records_admin::service", %url, "GET list");

        let response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(|e| self.transport("list", e))?;
        self.read_json("list", response)
    }

    fn get(&self, id: RecordId) -> Result<Option<I>, ApiError> {
        let url = self.item_url(id);
        tracing::debug!(target: "records_admin::service", %url, "GET item");

        let response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(|e| self.transport("get", e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.read_json("get", response).map(Some)
    }

    fn create(&self, draft: &D) -> Result<I, ApiError> {
        let url = self.collection_url();
        let body = self.encode("create", draft)?;
        tracing::debug!(target: "records_admin::service", %url, bytes = body.len(), "POST");

        let response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&body[..])
            .map_err(|e| self.transport("create", e))?;
        self.read_json("create", response)
    }

    fn update(&self, id: RecordId, draft: &D) -> Result<I, ApiError> {
        let url = self.item_url(id);
        let body = self.encode("update", draft)?;
        tracing::debug!(target: "records_admin::service", %url, bytes = body.len(), "PUT");

        let response = self
            .agent
            .put(url.as_str())
            .header("Content-Type", "application/json")
            .send(&body[..])
            .map_err(|e| self.transport("update", e))?;
        self.read_json("update", response)
    }

    fn delete(&self, id: RecordId) -> Result<(), ApiError> {
        let url = self.item_url(id);
        tracing::debug!(target: "records_admin::service", %url, "DELETE");

        let response = self
            .agent
            .delete(url.as_str())
            .call()
            .map_err(|e| self.transport("delete", e))?;
        self.check_status("delete", response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_built_from_injected_base() {
        let client = ApiClient::new(&ApiConfig::new("http://localhost:8080/api/"));
        assert_eq!(client.base_url(), "http://localhost:8080/api");
        assert_eq!(
            client.users().collection_url(),
            "http://localhost:8080/api/usuario"
        );
        assert_eq!(
            client.orders().item_url(12),
            "http://localhost:8080/api/orden/12"
        );
        assert_eq!(client.products().collection(), PRODUCTS);
    }

    #[test]
    fn test_unreachable_backend_is_a_transport_error() {
        let mut config = ApiConfig::new("http://127.0.0.1:9");
        config.timeout = Duration::from_millis(500);
        let client = ApiClient::new(&config);

        match client.users().list() {
            Err(ApiError::Transport { op, collection, .. }) => {
                assert_eq!(op, "list");
                assert_eq!(collection, USERS);
            }
            other => panic!("应为传输错误, 实际为 {:?}", other.map(|v| v.len())),
        }
    }
}
