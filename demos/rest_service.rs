//! A small notes service showing resource mappings served over HTTP.
//!
//! Run with `RUST_LOG=info cargo run --example rest_service` and try:
//!
//! ```text
//! curl http://127.0.0.1:8080/api/notes
//! curl http://127.0.0.1:8080/api/notes/count
//! curl -X POST -H 'Content-Type: application/json' -d '{"text":"buy milk"}' http://127.0.0.1:8080/api/notes
//! curl -H 'Accept: text/html' http://127.0.0.1:8080/api/notes/42
//! curl -X DELETE -H 'X-Api-Key: secret' http://127.0.0.1:8080/api/notes/1
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::info;
use serde::{Deserialize, Serialize};

use microrest_rs::rest::{Exchange, HandlerError, HandlerResult, MappingError, ResourceMappings};
use microrest_rs::{HttpController, HttpServer, ServerConfig, StatusCode};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Note {
    #[serde(default)]
    id: u64,
    text: String,
}

#[derive(Default)]
struct Notes {
    next_id: u64,
    items: BTreeMap<u64, Note>,
}

type Store = Arc<Mutex<Notes>>;

fn note_id(exchange: &Exchange<'_>) -> Result<u64, HandlerError> {
    let id = exchange.path_parameter("id").unwrap_or_default();
    id.parse()
        .map_err(|_| HandlerError::bad_request(format!("Invalid id parameter: {id}")))
}

fn require_api_key(exchange: &mut Exchange<'_>) -> HandlerResult {
    if exchange.request.header("X-Api-Key") != Some("secret") {
        let error = exchange
            .context
            .reject(StatusCode::Forbidden, "Forbidden", "X-Api-Key is missing or invalid");
        exchange.context.error_code = Some("AUTH-1".to_string());
        return Err(error);
    }
    Ok(())
}

fn mappings(store: Store) -> Result<ResourceMappings, MappingError> {
    let mut mappings = ResourceMappings::new();

    let notes = Arc::clone(&store);
    mappings
        .resource("notes")
        .get()
        .produces(["application/json"])?
        .serve(move |exchange| {
            let notes = notes.lock().unwrap_or_else(PoisonError::into_inner);
            let items: Vec<&Note> = notes.items.values().collect();
            exchange.send_json(StatusCode::Ok, &items)
        });

    let notes = Arc::clone(&store);
    mappings
        .resource("notes")
        .post()
        .consumes(["application/json"])?
        .serve(move |exchange| {
            let mut note: Note = serde_json::from_value(exchange.request.json_value()?)?;
            let mut notes = notes.lock().unwrap_or_else(PoisonError::into_inner);
            notes.next_id += 1;
            note.id = notes.next_id;
            notes.items.insert(note.id, note.clone());
            exchange.send_json(StatusCode::Created, &note)
        });

    let notes = Arc::clone(&store);
    mappings.resource("notes/count").get_with(move |exchange| {
        let count = notes.lock().unwrap_or_else(PoisonError::into_inner).items.len();
        exchange.send_json(StatusCode::Ok, &serde_json::json!({ "count": count }))
    });

    let notes = Arc::clone(&store);
    mappings.resource("notes/{id}").get().serve(move |exchange| {
        let id = note_id(exchange)?;
        let note = notes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .get(&id)
            .cloned()
            .ok_or_else(|| HandlerError::not_found(format!("Note {id} does not exist")))?;
        exchange.send_json(StatusCode::Ok, &note)
    });

    let notes = Arc::clone(&store);
    mappings
        .resource("notes/{id}")
        .delete()
        .before(require_api_key)
        .serve(move |exchange| {
            let id = note_id(exchange)?;
            match notes.lock().unwrap_or_else(PoisonError::into_inner).items.remove(&id) {
                Some(_) => {
                    exchange.response.set_status(StatusCode::NoContent);
                    Ok(())
                }
                None => Err(HandlerError::not_found(format!("Note {id} does not exist"))),
            }
        })
        .finally(|exchange| {
            info!("DELETE {} finished", exchange.request.resource_path());
            Ok(())
        });

    Ok(mappings)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::var("MICROREST_CONFIG") {
        Ok(json) => ServerConfig::from_json(&json)?,
        Err(_) => ServerConfig {
            context_path: "/api".to_string(),
            ..ServerConfig::default()
        },
    };

    let store = Store::default();
    let controller = HttpController::new(mappings(store)?).with_log_target("notes::rest");

    info!(
        "Mappings: {}",
        serde_json::to_string_pretty(&controller.mappings().describe())?
    );

    let server = HttpServer::new(config, controller);
    server.start().await?;

    Ok(())
}
