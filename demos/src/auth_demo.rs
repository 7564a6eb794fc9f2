use std::env;

use dotenv::dotenv;
use elibros_client::auth::{LoginRequest, RegisterForm, RouteAccess};
use elibros_client::Elibros;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let elibros = Elibros::from_env()?;
    let auth = elibros.auth_context();
    auth.initialize().await;

    println!("Starting auth demo against {}", elibros.options().api_url);

    let stamp = chrono::Utc::now().timestamp();
    let email = format!("leitor-{}@example.com", stamp);
    let password = env::var("ELIBROS_DEMO_PASSWORD").unwrap_or_else(|_| "senhaSegura123".to_string());

    let form = RegisterForm {
        nome: "Leitor Demo".to_string(),
        email: email.clone(),
        cpf: "123.456.789-09".to_string(),
        telefone: "11987654321".to_string(),
        dt_nasc: "1990-01-01".to_string(),
        username: format!("leitor{}", stamp),
        password: password.clone(),
        password_confirm: password.clone(),
    };

    let errors = form.validate();
    if !errors.is_empty() {
        println!("Formulário inválido: {:?}", errors);
        return Ok(());
    }

    println!("Registering {}", email);
    match auth.register(&form.into_request()?).await {
        Ok(user) => println!("Registered and logged in as {}", user.username),
        Err(e) => {
            println!("Registration failed: {}", e.user_message());
            println!("Trying to log in instead");
            let user = auth.login(&LoginRequest::new(&email, &password)).await?;
            println!("Logged in as {}", user.username);
        }
    }

    println!("Admin: {}", auth.is_admin());
    match auth.route_access(true) {
        RouteAccess::Allowed => println!("Admin pages are open"),
        other => println!("Admin pages answer {:?}", other),
    }

    auth.logout().await;
    println!("Logged out, authenticated = {}", auth.is_authenticated());

    Ok(())
}
