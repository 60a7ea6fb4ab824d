use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use chrono::{DateTime, Local, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use mockable::Clock;
use serde_json::Value;

use crate::core::error::{AppError, Result};
use crate::core::middleware::principal_middleware;
use crate::features::attachments::{routes, AttachmentService, AttachmentState, SignedLinkService};
use crate::features::auth::model::AccessClaims;
use crate::features::auth::JwtValidator;
use crate::features::orders::models::Order;
use crate::features::orders::OrderRepository;
use crate::modules::signing::{LinkSigner, SignatureAlgorithm};
use crate::modules::storage::LocalStorage;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_LINK_SECRET: &str = "test-link-secret";

/// Order seeded by [`TestApp::new`] and the customer who owns it
pub const TEST_ORDER_ID: i64 = 42;
pub const TEST_CUSTOMER_ID: i64 = 7;

/// Upload limit used by [`TestApp::new`]
pub const TEST_MAX_UPLOAD: usize = 1024;

/// Signed access token valid for an hour of wall-clock time
pub fn issue_token(user_id: i64, caps: &[&str], orders: &[i64]) -> String {
    sign_claims(AccessClaims {
        sub: user_id.to_string(),
        caps: caps.iter().map(|c| c.to_string()).collect(),
        orders: orders.to_vec(),
        exp: (Utc::now().timestamp() + 3600) as u64,
        iss: None,
    })
}

pub fn issue_token_for_subject(sub: &str) -> String {
    sign_claims(AccessClaims {
        sub: sub.to_string(),
        caps: vec![],
        orders: vec![],
        exp: (Utc::now().timestamp() + 3600) as u64,
        iss: None,
    })
}

pub fn issue_token_from_issuer(user_id: i64, iss: &str) -> String {
    sign_claims(AccessClaims {
        sub: user_id.to_string(),
        caps: vec![],
        orders: vec![],
        exp: (Utc::now().timestamp() + 3600) as u64,
        iss: Some(iss.to_string()),
    })
}

fn sign_claims(claims: AccessClaims) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Order store kept in memory, with a switch to make metadata writes fail
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: Mutex<HashMap<i64, Order>>,
    meta: Mutex<HashMap<(i64, String), Value>>,
    fail_updates: AtomicBool,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_order(&self, id: i64, customer_id: Option<i64>) -> Order {
        let order = Order { id, customer_id };
        self.orders.lock().unwrap().insert(id, order.clone());
        order
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Raw stored value, bypassing the failure switch
    pub fn raw_meta(&self, order_id: i64, key: &str) -> Option<Value> {
        self.meta
            .lock()
            .unwrap()
            .get(&(order_id, key.to_string()))
            .cloned()
    }

    pub fn set_raw_meta(&self, order_id: i64, key: &str, value: Value) {
        self.meta
            .lock()
            .unwrap()
            .insert((order_id, key.to_string()), value);
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_order(&self, order_id: i64) -> Result<Option<Order>> {
        Ok(self.orders.lock().unwrap().get(&order_id).cloned())
    }

    async fn get_meta(&self, order: &Order, key: &str) -> Result<Option<Value>> {
        Ok(self.raw_meta(order.id, key))
    }

    async fn update_meta(&self, order: &Order, key: &str, value: Value) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::Internal("metadata write failed".to_string()));
        }
        self.set_raw_meta(order.id, key, value);
        Ok(())
    }
}

/// Clock frozen at a settable unix time
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(secs: i64) -> Self {
        Self {
            now: Mutex::new(DateTime::from_timestamp(secs, 0).unwrap()),
        }
    }

    pub fn set(&self, secs: i64) {
        *self.now.lock().unwrap() = DateTime::from_timestamp(secs, 0).unwrap();
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Attachment routes behind the principal middleware, over temp storage
pub struct TestApp {
    pub server: TestServer,
    pub orders: Arc<InMemoryOrderRepository>,
    pub clock: Arc<FixedClock>,
    pub link_service: Arc<SignedLinkService>,
    _storage_dir: tempfile::TempDir,
}

impl TestApp {
    /// Clock starts at `now`; order [`TEST_ORDER_ID`] belongs to [`TEST_CUSTOMER_ID`]
    pub fn new(now: i64) -> Self {
        let storage_dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(storage_dir.path()).unwrap());
        let orders = Arc::new(InMemoryOrderRepository::new());
        orders.insert_order(TEST_ORDER_ID, Some(TEST_CUSTOMER_ID));
        let clock = Arc::new(FixedClock::at(now));

        let attachment_service = Arc::new(AttachmentService::new(
            orders.clone(),
            storage,
            clock.clone(),
            TEST_MAX_UPLOAD,
        ));
        let signer =
            LinkSigner::new(TEST_LINK_SECRET, SignatureAlgorithm::HmacSha256, 32, 3600).unwrap();
        let link_service = Arc::new(SignedLinkService::new(
            signer,
            orders.clone(),
            attachment_service.clone(),
            clock.clone(),
            "http://localhost",
        ));

        let state = AttachmentState {
            orders: orders.clone(),
            attachment_service,
            link_service: link_service.clone(),
        };
        let validator = Arc::new(JwtValidator::new(
            TEST_JWT_SECRET,
            None,
            Duration::from_secs(0),
        ));

        let app: Router = routes::routes(state, TEST_MAX_UPLOAD / 3 * 4 + 1024).layer(
            axum::middleware::from_fn_with_state(validator, principal_middleware),
        );

        Self {
            server: TestServer::new(app).unwrap(),
            orders,
            clock,
            link_service,
            _storage_dir: storage_dir,
        }
    }

    /// Path and query of a freshly minted link, ready for the test server
    pub fn download_path(&self, order_id: i64, attachment_id: &str) -> String {
        self.link_service
            .mint_download_url(order_id, attachment_id)
            .trim_start_matches("http://localhost")
            .to_string()
    }
}
