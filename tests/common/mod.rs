use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bson::oid::ObjectId;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use chrono::Utc;
use elfume::auth::AuthService;
use elfume::config::{AdminSeed, Config};
use elfume::db::{self, PerfumeStore, RoleStore, StoreError, StoreResult, UserStore};
use elfume::models::perfume::SEARCHABLE_FIELDS;
use elfume::models::{NewUser, Perfume, PerfumeChanges, Role, User, UserChanges};
use elfume::state::AppState;
use elfume::upload::{ImageUploader, UploadError};

pub const ADMIN_EMAIL: &str = "admin@elfume.test";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// A running test server backed by in-memory stores.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub auth: AuthService,
    pub users: Arc<MemoryUserStore>,
    pub perfumes: Arc<MemoryPerfumeStore>,
    pub images: Arc<RecordingUploader>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn register(&self, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/auth/register"))
            .json(body)
            .send()
            .await
            .expect("register request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Register a customer with the given username/email and a valid phone.
    pub async fn register_customer(&self, username: &str, email: &str) -> Value {
        let (body, status) = self
            .register(&json!({
                "username": username,
                "email": email,
                "password": "secret-password",
                "phone": "081234567890",
            }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body
    }

    pub async fn login(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(body)
            .send()
            .await
            .expect("login request failed")
    }

    /// Log in by email and return the token.
    pub async fn token_for(&self, email: &str, password: &str) -> String {
        let resp = self
            .login(&json!({ "email": email, "password": password }))
            .await;
        assert_eq!(resp.status(), StatusCode::OK, "login failed");
        let body: Value = resp.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Create the seeded admin account (role "1") and return its token.
    pub async fn admin_token(&self) -> String {
        self.auth
            .ensure_admin(&admin_seed())
            .await
            .expect("admin seed failed");
        self.token_for(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Register a customer and return `(user_id, token)`.
    pub async fn customer(&self, username: &str, email: &str) -> (String, String) {
        let body = self.register_customer(username, email).await;
        let id = body["user"]["user_id"].as_str().unwrap().to_string();
        let token = self.token_for(email, "secret-password").await;
        (id, token)
    }

    pub async fn get(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Insert a perfume through the JSON endpoint and return its id.
    pub async fn insert_perfume(&self, token: &str, body: &Value) -> String {
        let (body, status) = self.post_auth("/fume/insert", token, body).await;
        assert_eq!(status, StatusCode::CREATED, "insert perfume failed: {body}");
        body["perfume"]["perfume_id"].as_str().unwrap().to_string()
    }
}

pub fn test_config() -> Config {
    Config {
        mongo_url: "mongodb://unused".to_string(),
        mongo_db: "elfume_test".to_string(),
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        max_body_size: 1_048_576,
        cookie_secure: false,
        log_level: "warn".to_string(),
        github: None,
        admin: None,
    }
}

pub fn admin_seed() -> AdminSeed {
    AdminSeed {
        username: "admin".to_string(),
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
        phone: "081111111111".to_string(),
    }
}

/// Spawn a test app with empty stores, seeded roles and a recording image host.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_images(true).await
}

pub async fn spawn_app_with_images(images_enabled: bool) -> TestApp {
    let users = Arc::new(MemoryUserStore::default());
    let roles = Arc::new(MemoryRoleStore::default());
    let perfumes = Arc::new(MemoryPerfumeStore::default());
    let images = Arc::new(RecordingUploader::default());

    db::seed_default_roles(roles.as_ref())
        .await
        .expect("Failed to seed roles");

    let uploader: Option<Arc<dyn ImageUploader>> = if images_enabled {
        Some(images.clone())
    } else {
        None
    };

    let state = AppState::new(
        test_config(),
        users.clone(),
        roles,
        perfumes.clone(),
        uploader,
    );
    let auth = state.auth.clone();
    let app = elfume::build_app(state);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        client,
        auth,
        users,
        perfumes,
        images,
    }
}

// ── In-memory stores ────────────────────────────────────────────

fn apply_user_changes(user: &mut User, changes: UserChanges) {
    let UserChanges {
        username,
        email,
        password_hash,
        phone,
        role_id,
        role_name,
    } = changes;
    let slots = [
        (username, &mut user.username),
        (email, &mut user.email),
        (password_hash, &mut user.password),
        (phone, &mut user.phone),
        (role_id, &mut user.role_id),
        (role_name, &mut user.role_name),
    ];
    for (value, slot) in slots {
        if let Some(value) = value {
            *slot = value;
        }
    }
    user.updated_at = Utc::now();
}

fn apply_perfume_changes(perfume: &mut Perfume, changes: PerfumeChanges) {
    for (field, value) in changes.supplied() {
        let slot = match field {
            "name" => &mut perfume.name,
            "brand" => &mut perfume.brand,
            "types" => &mut perfume.types,
            "categories" => &mut perfume.categories,
            "sizes" => &mut perfume.sizes,
            "price" => &mut perfume.price,
            "description" => &mut perfume.description,
            "stock" => &mut perfume.stock,
            _ => continue,
        };
        *slot = value.to_string();
    }
    perfume.updated_at = Utc::now();
}

fn perfume_field<'a>(perfume: &'a Perfume, field: &str) -> Option<&'a str> {
    let value = match field {
        "name" => &perfume.name,
        "brand" => &perfume.brand,
        "types" => &perfume.types,
        "categories" => &perfume.categories,
        "sizes" => &perfume.sizes,
        "price" => &perfume.price,
        "description" => &perfume.description,
        "stock" => &perfume.stock,
        _ => return None,
    };
    Some(value)
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        Ok(self.users.lock().unwrap().iter().any(|u| u.email == email))
    }

    async fn exists_by_username(&self, username: &str) -> StoreResult<bool> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .any(|u| u.username == username))
    }

    async fn find_by_identity(&self, email: &str, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| {
                (!email.is_empty() && u.email == email)
                    || (!username.is_empty() && u.username == username)
            })
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let oid = db::parse_object_id(id)?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == oid)
            .cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("username".to_string()));
        }
        let user = User::new(user);
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: &str, changes: UserChanges) -> StoreResult<User> {
        let oid = db::parse_object_id(id)?;
        let mut users = self.users.lock().unwrap();

        if let Some(email) = &changes.email {
            if users.iter().any(|u| u.id != oid && &u.email == email) {
                return Err(StoreError::Duplicate("email".to_string()));
            }
        }
        if let Some(username) = &changes.username {
            if users.iter().any(|u| u.id != oid && &u.username == username) {
                return Err(StoreError::Duplicate("username".to_string()));
            }
        }

        let user = users
            .iter_mut()
            .find(|u| u.id == oid)
            .ok_or(StoreError::NotFound("user"))?;
        apply_user_changes(user, changes);
        Ok(user.clone())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let oid = db::parse_object_id(id)?;
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != oid);
        if users.len() == before {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRoleStore {
    roles: Mutex<Vec<Role>>,
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Role>> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn create(&self, mut role: Role) -> StoreResult<Role> {
        let mut roles = self.roles.lock().unwrap();
        if role.id.is_empty() {
            role.id = ObjectId::new().to_hex();
        }
        if roles.iter().any(|r| r.id == role.id) {
            return Err(StoreError::Duplicate("_id".to_string()));
        }
        roles.push(role.clone());
        Ok(role)
    }

    async fn list(&self) -> StoreResult<Vec<Role>> {
        Ok(self.roles.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct MemoryPerfumeStore {
    perfumes: Mutex<Vec<Perfume>>,
}

impl MemoryPerfumeStore {
    pub fn count(&self) -> usize {
        self.perfumes.lock().unwrap().len()
    }
}

#[async_trait]
impl PerfumeStore for MemoryPerfumeStore {
    async fn insert(&self, perfume: Perfume) -> StoreResult<Perfume> {
        self.perfumes.lock().unwrap().push(perfume.clone());
        Ok(perfume)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Perfume>> {
        let oid = db::parse_object_id(id)?;
        Ok(self
            .perfumes
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == oid)
            .cloned())
    }

    async fn list(&self) -> StoreResult<Vec<Perfume>> {
        Ok(self.perfumes.lock().unwrap().clone())
    }

    async fn search(&self, filters: Vec<(String, String)>) -> StoreResult<Vec<Perfume>> {
        let filters: Vec<(String, String)> = filters
            .into_iter()
            .filter(|(field, value)| {
                !value.is_empty() && SEARCHABLE_FIELDS.contains(&field.as_str())
            })
            .map(|(field, value)| (field, value.to_lowercase()))
            .collect();

        Ok(self
            .perfumes
            .lock()
            .unwrap()
            .iter()
            .filter(|p| {
                filters.iter().all(|(field, value)| {
                    perfume_field(p, field)
                        .is_some_and(|stored| stored.to_lowercase().contains(value.as_str()))
                })
            })
            .cloned()
            .collect())
    }

    async fn update(&self, id: &str, changes: PerfumeChanges) -> StoreResult<Perfume> {
        let oid = db::parse_object_id(id)?;
        let mut perfumes = self.perfumes.lock().unwrap();
        let perfume = perfumes
            .iter_mut()
            .find(|p| p.id == oid)
            .ok_or(StoreError::NotFound("perfume"))?;
        apply_perfume_changes(perfume, changes);
        Ok(perfume.clone())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let oid = db::parse_object_id(id)?;
        let mut perfumes = self.perfumes.lock().unwrap();
        let before = perfumes.len();
        perfumes.retain(|p| p.id != oid);
        if perfumes.len() == before {
            return Err(StoreError::NotFound("perfume"));
        }
        Ok(())
    }
}

/// Image host double that keeps uploads in memory.
#[derive(Default)]
pub struct RecordingUploader {
    uploads: Mutex<HashMap<String, Vec<u8>>>,
    rejecting: AtomicBool,
}

impl RecordingUploader {
    /// Make every later upload fail the way a refusing host does.
    pub fn reject_uploads(&self) {
        self.rejecting.store(true, Ordering::SeqCst);
    }

    pub fn uploaded(&self, file_name: &str) -> Option<Vec<u8>> {
        self.uploads.lock().unwrap().get(file_name).cloned()
    }
}

#[async_trait]
impl ImageUploader for RecordingUploader {
    async fn upload(&self, file_name: &str, content: &[u8]) -> Result<String, UploadError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(UploadError::Rejected {
                status: 422,
                body: "Invalid request".to_string(),
            });
        }
        self.uploads
            .lock()
            .unwrap()
            .insert(file_name.to_string(), content.to_vec());
        Ok(format!("https://images.test/{file_name}"))
    }
}
