mod common;

use std::time::Duration;

use common::{cart_item, cart_page, harness, seed_session, token, user_json, Harness};
use elibros_client::auth::{AuthContext, LoginRequest};
use elibros_client::cart::{CartContext, CartState};
use elibros_client::error::Error;
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn logged_in(server: &MockServer) -> (Harness, AuthContext, CartContext) {
    let h = harness(server);
    seed_session(&h.store, &token(3600));

    Mock::given(method("POST"))
        .and(path("/auth/verify/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    let auth = h.elibros.auth_context();
    auth.initialize().await;
    assert!(auth.is_authenticated());
    let cart = h.elibros.cart_context(&auth);
    (h, auth, cart)
}

#[tokio::test]
async fn test_totals_follow_mutations() {
    let server = MockServer::start().await;
    let (_h, _auth, cart) = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/carrinhos/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_page(vec![cart_item(1, "29.90", 1)])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/carrinhos/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_page(vec![
            cart_item(1, "29.90", 1),
            cart_item(2, "49,90", 2),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/carrinhos/atualizar_carrinho/"))
        .and(body_json(json!({ "acao": "adicionar", "livro_id": 20, "quantidade": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    cart.refresh().await;
    assert_eq!(cart.total_items(), 1);
    assert_eq!(cart.total_price(), Decimal::new(2990, 2));

    cart.add_to_cart(20, 2).await.unwrap();

    let state = cart.state();
    assert_eq!(state.items.len(), 2);
    assert_eq!(state.total_items, 3);
    assert_eq!(state.total_price, Decimal::new(12970, 2));
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_zero_quantity_removes_line() {
    let server = MockServer::start().await;
    let (_h, _auth, cart) = logged_in(&server).await;

    Mock::given(method("POST"))
        .and(path("/carrinhos/atualizar_carrinho/"))
        .and(body_json(json!({ "acao": "remover", "item_id": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/carrinhos/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_page(vec![cart_item(1, "10.00", 3)])))
        .mount(&server)
        .await;

    cart.update_quantity(2, 0).await.unwrap();

    assert_eq!(cart.total_items(), 3);
    assert_eq!(cart.total_price(), Decimal::new(3000, 2));
}

#[tokio::test]
async fn test_clear_cart_sends_limpar() {
    let server = MockServer::start().await;
    let (_h, _auth, cart) = logged_in(&server).await;

    Mock::given(method("POST"))
        .and(path("/carrinhos/atualizar_carrinho/"))
        .and(body_json(json!({ "acao": "limpar" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/carrinhos/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 0, "results": [] })))
        .mount(&server)
        .await;

    cart.clear_cart().await.unwrap();
    assert!(cart.items().is_empty());
    assert_eq!(cart.total_price(), Decimal::ZERO);
}

#[tokio::test]
async fn test_logout_empties_cart_and_refuses_mutations() {
    let server = MockServer::start().await;
    let (_h, auth, cart) = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/carrinhos/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_page(vec![cart_item(1, "15.00", 2)])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/usuarios/logout/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/carrinhos/atualizar_carrinho/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    cart.refresh().await;
    assert_eq!(cart.total_items(), 2);
    assert_eq!(cart.total_price(), Decimal::new(3000, 2));

    auth.logout().await;
    assert!(!cart.can_use_cart());
    assert_eq!(cart.total_items(), 0);
    assert_eq!(cart.total_price(), Decimal::ZERO);
    assert!(cart.items().is_empty());

    let err = cart.add_to_cart(10, 1).await.unwrap_err();
    assert!(matches!(err, Error::NotLoggedIn(_)));
    assert_eq!(err.to_string(), "Faça login para adicionar itens ao carrinho");

    let err = cart.remove_from_cart(1).await.unwrap_err();
    assert_eq!(err.to_string(), "Usuário deve estar logado para remover itens do carrinho");
    assert!(cart.update_quantity(1, 5).await.is_err());
    assert!(cart.clear_cart().await.is_err());

    assert_eq!(cart.state(), CartState::default());
}

#[tokio::test]
async fn test_failed_mutation_keeps_lines() {
    let server = MockServer::start().await;
    let (_h, _auth, cart) = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/carrinhos/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_page(vec![cart_item(1, "15.00", 1)])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/carrinhos/atualizar_carrinho/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "Estoque insuficiente" })))
        .mount(&server)
        .await;

    cart.refresh().await;
    let err = cart.add_to_cart(10, 99).await.unwrap_err();

    assert_eq!(err.to_string(), "API Error: Estoque insuficiente");
    assert_eq!(cart.total_items(), 1);
    assert!(!cart.is_loading());
}

#[tokio::test]
async fn test_refresh_failures() {
    let server = MockServer::start().await;
    let (h, _auth, cart) = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/carrinhos/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_page(vec![cart_item(1, "15.00", 1)])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/carrinhos/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    cart.refresh().await;
    assert_eq!(cart.total_items(), 1);

    // server error: the cart is emptied
    cart.refresh().await;
    assert_eq!(cart.total_items(), 0);
    assert!(h.redirect.paths().is_empty());
}

#[tokio::test]
async fn test_rejected_token_drops_lines_and_session() {
    let server = MockServer::start().await;
    let (h, auth, cart) = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/carrinhos/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_page(vec![cart_item(1, "15.00", 4)])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/carrinhos/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    cart.refresh().await;
    assert_eq!(cart.total_items(), 4);

    cart.refresh().await;

    assert_eq!(cart.total_items(), 0);
    assert!(!auth.is_authenticated());
    assert_eq!(h.redirect.paths(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn test_follow_session_reloads_on_login_and_empties_on_logout() {
    let server = MockServer::start().await;
    let h = harness(&server);

    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user_json(1, false),
            "refresh": "refresh-1",
            "access": token(3600)
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/carrinhos/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_page(vec![
            cart_item(1, "15.00", 1),
            cart_item(2, "15.00", 1),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/usuarios/logout/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let auth = h.elibros.auth_context();
    auth.initialize().await;
    let cart = h.elibros.cart_context(&auth);
    let follower = tokio::spawn(cart.clone().follow_session());

    auth.login(&LoginRequest::new("leitor1@example.com", "segredo"))
        .await
        .unwrap();
    for _ in 0..100 {
        if cart.total_items() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(cart.total_items(), 2);
    assert_eq!(cart.total_price(), Decimal::new(3000, 2));

    auth.logout().await;
    assert_eq!(cart.total_items(), 0);
    assert!(cart.items().is_empty());

    follower.abort();
}
