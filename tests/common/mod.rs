#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use elibros_client::fetch::Redirect;
use elibros_client::store::{MemoryStore, SessionStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use elibros_client::Elibros;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::MockServer;

/// Redirect hook that remembers where it was sent
#[derive(Default)]
pub struct RecordingRedirect {
    pub paths: Mutex<Vec<String>>,
}

impl Redirect for RecordingRedirect {
    fn redirect_to(&self, path: &str) {
        self.paths.lock().unwrap().push(path.to_string());
    }
}

impl RecordingRedirect {
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

pub struct Harness {
    pub elibros: Elibros,
    pub store: Arc<MemoryStore>,
    pub redirect: Arc<RecordingRedirect>,
}

pub fn harness(server: &MockServer) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let redirect = Arc::new(RecordingRedirect::default());
    let elibros = Elibros::new(&server.uri())
        .with_store(store.clone())
        .with_redirect(redirect.clone());
    Harness {
        elibros,
        store,
        redirect,
    }
}

/// HS256 token expiring `offset` seconds from now
pub fn token(offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    encode(
        &Header::default(),
        &json!({ "exp": now + offset, "user_id": 1 }),
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}

pub fn user_json(id: u64, staff: bool) -> Value {
    json!({
        "id": id,
        "email": format!("leitor{}@example.com", id),
        "username": format!("leitor{}", id),
        "nome": "Leitor",
        "is_staff": staff,
        "is_superuser": false
    })
}

/// Put a logged in session into the store
pub fn seed_session(store: &MemoryStore, access: &str) {
    store.set(ACCESS_TOKEN_KEY, access).unwrap();
    store.set(REFRESH_TOKEN_KEY, "refresh-1").unwrap();
    store.set(USER_KEY, &user_json(1, false).to_string()).unwrap();
}

pub fn cart_item(id: u64, preco: &str, quantidade: u32) -> Value {
    json!({
        "id": id,
        "livro": {
            "id": id * 10,
            "titulo": format!("Livro {}", id),
            "capa_url": null,
            "preco": preco,
            "autores": ["Autor"]
        },
        "quantidade": quantidade
    })
}

pub fn cart_page(items: Vec<Value>) -> Value {
    json!({
        "count": 1,
        "next": null,
        "previous": null,
        "results": [{ "id": 1, "cliente": 1, "itens": items }]
    })
}
