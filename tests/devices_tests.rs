use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use powerflow_rust::auth::{FileStorage, MemoryStorage, SessionContext};
use powerflow_rust::config::ClientOptions;
use powerflow_rust::prelude::*;

const TOKEN: &str = "tok-123";

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({"correo": "ana@example.com", "password": "secreto"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": TOKEN,
            "usuario": {"id": 1, "nombre": "Ana", "correo": "ana@example.com"}
        })))
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> PowerFlow {
    let options = ClientOptions::default().with_api_url(&server.uri()).unwrap();
    PowerFlow::with_session(options, SessionContext::init(Arc::new(MemoryStorage::new()))).unwrap()
}

async fn logged_in(server: &MockServer) -> PowerFlow {
    mount_login(server).await;
    let powerflow = client(server);
    powerflow
        .login(&LoginForm::new("ana@example.com", "secreto"))
        .await
        .unwrap();
    powerflow
}

#[tokio::test]
async fn test_created_device_comes_back_on_fetch() {
    let server = MockServer::start().await;
    let powerflow = logged_in(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/dispositivos"))
        .and(header("authorization", "Bearer tok-123"))
        .and(body_json(json!({
            "nombre": "Lampara",
            "categoria": "Iluminación",
            "potencia_watts": 60.0,
            "horas_uso_dia": 5.0
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "mensaje": "Dispositivo registrado correctamente",
            "usuario": "Ana",
            "dispositivo": {
                "id": 7,
                "nombre": "Lampara",
                "categoria": "Iluminación",
                "potencia_watts": 60.0,
                "horas_uso_dia": 5.0
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/dispositivos"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 7,
            "nombre": "Lampara",
            "categoria": "Iluminación",
            "potencia_watts": 60.0,
            "horas_uso_dia": 5.0
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let form = DeviceForm {
        name: "Lampara".to_string(),
        category: "Iluminación".to_string(),
        power_watts: "60".to_string(),
        daily_usage_hours: "5".to_string(),
    };

    let devices = powerflow.devices();
    let mut collection = powerflow.collection();
    let created = collection.create(&devices, &form).await.unwrap();

    assert_eq!(created.id, OpaqueId::from(7));
    assert_eq!(collection.len(), 1);

    let fetched = collection.get(&created.id).unwrap();
    assert_eq!(fetched.name, "Lampara");
    assert_eq!(fetched.category, Some(Category::Lighting));
    assert_eq!(fetched.power_watts, Some(60.0));
    assert_eq!(fetched.daily_usage_hours, 5.0);
    assert_eq!(fetched.monthly_kwh(), Some(9.0));
}

#[tokio::test]
async fn test_listing_requires_a_token() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    // first mounted match wins
    Mock::given(method("GET"))
        .and(path("/api/dispositivos"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dispositivos"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Token faltante"})))
        .mount(&server)
        .await;

    let powerflow = client(&server);

    let anonymous = powerflow.devices().list().await;
    assert!(matches!(anonymous, Err(Error::NotLoggedIn)));

    let session = powerflow
        .login(&LoginForm::new("ana@example.com", "secreto"))
        .await
        .unwrap();
    assert_eq!(session.token, TOKEN);
    assert_eq!(session.user.name, "Ana");

    assert!(powerflow.devices().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unauthorized_response_ends_the_session() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let session_path = dir.path().join("session.json");

    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/dispositivos"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Token expirado"})))
        .mount(&server)
        .await;

    let options = ClientOptions::default()
        .with_api_url(&server.uri())
        .unwrap()
        .with_session_path(&session_path);
    let powerflow = PowerFlow::new(options).unwrap();
    powerflow
        .login(&LoginForm::new("ana@example.com", "secreto"))
        .await
        .unwrap();
    assert!(session_path.exists());

    let mut collection = powerflow.collection();
    collection.replace(vec![]);
    let result = collection.refresh(&powerflow.devices()).await;

    let err = result.unwrap_err();
    assert!(matches!(err, Error::Unauthorized));
    assert!(err.requires_login());
    assert_eq!(err.user_message(), "Sesión expirada");
    assert!(!powerflow.session().is_authenticated());
    assert!(!collection.is_loaded());

    // nothing left on disk for the next start either
    let restored = SessionContext::init(Arc::new(FileStorage::new(&session_path)));
    assert!(!restored.is_authenticated());
}

#[tokio::test]
async fn test_message_body_and_missing_listing_mean_empty() {
    let server = MockServer::start().await;
    let powerflow = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/dispositivos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"mensaje": "No tienes dispositivos registrados"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dispositivos"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let devices = powerflow.devices();
    assert!(devices.list().await.unwrap().is_empty());
    assert!(devices.list().await.unwrap().is_empty());

    let mut collection = powerflow.collection();
    collection.refresh(&devices).await.unwrap();
    assert!(collection.is_loaded());
    assert!(collection.top(3, 6.0).is_placeholder());
}

#[tokio::test]
async fn test_malformed_listing_is_an_error() {
    let server = MockServer::start().await;
    let powerflow = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/dispositivos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "nombre": "Horno", "categoria": "Otros", "potencia_watts": -5}
        ])))
        .mount(&server)
        .await;

    let result = powerflow.devices().list().await;
    assert!(matches!(result, Err(Error::MalformedResponse(_))));
}

#[tokio::test]
async fn test_off_list_category_keeps_the_rest_of_the_listing() {
    let server = MockServer::start().await;
    let powerflow = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/dispositivos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "nombre": "Horno", "categoria": "Cocina", "potencia_watts": 2000},
            {"id": 2, "nombre": "Nevera", "categoria": "Electrodomésticos", "potencia_watts": 150}
        ])))
        .mount(&server)
        .await;

    let devices = powerflow.devices().list().await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].name, "Horno");
    assert_eq!(devices[0].category, None);
    assert_eq!(devices[1].category, Some(Category::Appliances));
}

#[tokio::test]
async fn test_update_and_delete_refresh_the_collection() {
    let server = MockServer::start().await;
    let powerflow = logged_in(&server).await;

    Mock::given(method("PUT"))
        .and(path("/api/dispositivos/3"))
        .and(body_json(json!({
            "nombre": "Refrigerador",
            "categoria": "Electrodomésticos",
            "potencia_watts": null,
            "horas_uso_dia": 24.0
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"mensaje": "Dispositivo actualizado"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/dispositivos/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    // one listing after the update, an empty one after the delete
    Mock::given(method("GET"))
        .and(path("/api/dispositivos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 3,
            "nombre": "Refrigerador",
            "categoria": "Electrodomésticos",
            "potencia_watts": null,
            "horas_uso_dia": 24
        }])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dispositivos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let devices = powerflow.devices();
    let mut collection = powerflow.collection();
    let id = OpaqueId::from(3);

    let form = DeviceForm {
        name: "Refrigerador".to_string(),
        category: "electrodomesticos".to_string(),
        power_watts: String::new(),
        daily_usage_hours: "24".to_string(),
    };
    collection.update(&devices, &id, &form).await.unwrap();
    assert_eq!(collection.get(&id).unwrap().power_watts, None);

    collection.delete(&devices, &id).await.unwrap();
    assert!(collection.is_empty());
}

#[tokio::test]
async fn test_backend_rejection_message_is_surfaced() {
    let server = MockServer::start().await;
    let powerflow = logged_in(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/dispositivos"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "El campo 'nombre' es obligatorio"})),
        )
        .mount(&server)
        .await;

    let form = DeviceForm {
        name: "Bomba".to_string(),
        category: "Otros".to_string(),
        ..DeviceForm::new()
    };
    let err = powerflow
        .collection()
        .create(&powerflow.devices(), &form)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Api { status: 400, .. }));
    assert_eq!(err.user_message(), "El campo 'nombre' es obligatorio");
    assert!(powerflow.session().is_authenticated());
}

#[tokio::test]
async fn test_summary_over_fetched_devices() {
    let server = MockServer::start().await;
    let powerflow = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/dispositivos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "nombre": "Aire", "categoria": "Climatización", "potencia_watts": 1000, "horas_uso_dia": 2},
            {"id": 2, "nombre": "Lavadora", "categoria": "Electrodomésticos", "potencia_watts": 500, "horas_uso_dia": 1},
            {"id": 3, "nombre": "Cargador", "categoria": "Electrónica", "potencia_watts": null}
        ])))
        .mount(&server)
        .await;

    let mut collection = powerflow.collection();
    collection.refresh(&powerflow.devices()).await.unwrap();

    let options = powerflow.options();
    let stats = collection.stats(options.summary_usage_hours, options.rate_per_kwh);
    assert_eq!(stats.count, 3);
    assert_eq!(stats.total_monthly_kwh, 270.0);

    let rows = collection.top(3, options.summary_usage_hours).rows();
    assert_eq!(rows[0].0, "Aire");
    assert_eq!(rows[2], ("Cargador".to_string(), None));
}
