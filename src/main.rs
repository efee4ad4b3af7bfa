use keycloak_pkce::ui::App;

fn main() {
    dioxus::logger::initialize_default();
    tracing::info!("Starting keycloak-pkce client");
    dioxus::launch(App);
}
