//! Tests for resource mappings, routing and dispatch.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use crate::parser::{HttpRequest, HttpVersion, Method};
    use crate::rest::{
        placeholder_count, translate, DispatchError, Exchange, HandlerConfiguration, HandlerError, HandlerResult,
        HttpController, MappingError, Phase, Request, Resource, ResourceMappings, Response, RouteHandler, Router,
    };
    use crate::server::{HttpResponse, StatusCode};

    type Events = Arc<Mutex<Vec<&'static str>>>;

    fn events() -> Events {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn recorded(events: &Events) -> Vec<&'static str> {
        events.lock().unwrap().clone()
    }

    fn record(
        events: &Events,
        event: &'static str,
    ) -> impl Fn(&mut Exchange<'_>) -> HandlerResult + Send + Sync + 'static {
        let events = Arc::clone(events);
        move |_: &mut Exchange<'_>| {
            events.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn ok(_: &mut Exchange<'_>) -> HandlerResult {
        Ok(())
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn request(method: Method, target: &str, headers: &[(&str, &str)]) -> HttpRequest {
        let headers = headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        HttpRequest::new(method, target, HttpVersion::Http11, headers)
    }

    fn dispatch(controller: &HttpController, request: &HttpRequest) -> (HttpResponse, Result<(), DispatchError>) {
        let mut response = HttpResponse::default();
        let outcome = controller.execute(request, &mut response);
        (response, outcome)
    }

    fn observed(controller: HttpController) -> (HttpController, Arc<Mutex<Vec<Phase>>>) {
        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&phases);
        let controller = controller.with_observer(move |phase| sink.lock().unwrap().push(phase));
        (controller, phases)
    }

    // Router

    #[test]
    fn test_template_translation() {
        assert_eq!(translate("users/{id}/files/{path*}"), "users/:id/files/*path");
        assert_eq!(translate("count"), "count");
        assert_eq!(placeholder_count("users/{id}/files/{path*}"), 2);
        assert_eq!(placeholder_count(""), 0);
    }

    #[test]
    fn test_literal_template_beats_parameter() {
        let router = Router::new(["", "{id}", "count"]);

        let best = router.best_match("count", |_| true).unwrap();
        assert_eq!(best.defined_path, "count");
        assert_eq!(best.weight, 1);
        assert!(best.path_parameters.is_empty());

        // Both templates match; the parameterized one ranks second.
        let all = router.matches("count", |_| true);
        let defined: Vec<&str> = all.iter().map(|m| m.defined_path.as_str()).collect();
        assert_eq!(defined, vec!["count", "{id}"]);
        assert_eq!(all[1].path_parameters.get("id").map(String::as_str), Some("count"));

        let best = router.best_match("42", |_| true).unwrap();
        assert_eq!(best.defined_path, "{id}");
        assert_eq!(best.path_parameters.get("id").map(String::as_str), Some("42"));

        let best = router.best_match("", |_| true).unwrap();
        assert_eq!(best.defined_path, "");
    }

    #[test]
    fn test_rooted_and_relative_paths_match_alike() {
        let router = Router::new(["/r", "r/{id}"]);

        assert_eq!(router.best_match("/r", |_| true).unwrap().defined_path, "/r");
        assert_eq!(router.best_match("r", |_| true).unwrap().defined_path, "/r");
        assert_eq!(router.best_match("/r/7", |_| true).unwrap().defined_path, "r/{id}");
    }

    #[test]
    fn test_fewer_placeholders_break_ties() {
        let router = Router::new(["items/{a}/{rest*}", "items/{id}"]);

        let all = router.matches("items/5", |_| true);
        let defined: Vec<&str> = all.iter().map(|m| m.defined_path.as_str()).collect();
        assert_eq!(defined, vec!["items/{id}", "items/{a}/{rest*}"]);
        assert!(all.iter().all(|m| m.weight == 0));

        // Stable across calls.
        for _ in 0..5 {
            assert_eq!(router.matches("items/5", |_| true), all);
        }
    }

    #[test]
    fn test_catch_all_parameter() {
        let router = Router::new(["files/{path*}"]);

        let matched = router.best_match("files/docs/2024/report.pdf", |_| true).unwrap();
        assert_eq!(
            matched.path_parameters.get("path").map(String::as_str),
            Some("docs/2024/report.pdf")
        );

        let matched = router.best_match("files", |_| true).unwrap();
        assert_eq!(matched.path_parameters.get("path").map(String::as_str), Some(""));
        assert_eq!(matched.weight, 0);

        assert!(router.best_match("images/logo.png", |_| true).is_none());
    }

    #[test]
    fn test_filter_restricts_candidates() {
        let router = Router::new(["count", "{id}"]);

        let best = router.best_match("count", |template| template != "count").unwrap();
        assert_eq!(best.defined_path, "{id}");
        assert!(router.best_match("count", |_| false).is_none());
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_parameter_names_with_punctuation() {
        assert_eq!(translate("users/{user-id}/{file.name}"), "users/:user-id/:file.name");

        let router = Router::new(["users/{user-id}", "accounts/{account.id}"]);

        let matched = router.best_match("users/5", |_| true).unwrap();
        assert_eq!(matched.defined_path, "users/{user-id}");
        assert_eq!(matched.path_parameters.get("user-id").map(String::as_str), Some("5"));

        let matched = router.best_match("accounts/9", |_| true).unwrap();
        assert_eq!(matched.path_parameters.get("account.id").map(String::as_str), Some("9"));
    }

    #[test]
    fn test_empty_last_segment_binds_empty_parameter() {
        let router = Router::new(["users", "users/{id}"]);

        let matched = router.best_match("users/", |_| true).unwrap();
        assert_eq!(matched.defined_path, "users/{id}");
        assert_eq!(matched.path_parameters.get("id").map(String::as_str), Some(""));
        assert_eq!(matched.weight, 0);

        assert_eq!(router.best_match("users", |_| true).unwrap().defined_path, "users");

        let router = Router::new(["{id}"]);
        let matched = router.best_match("/", |_| true).unwrap();
        assert_eq!(matched.path_parameters.get("id").map(String::as_str), Some(""));
    }

    // Registry

    #[test]
    fn test_mime_settings_are_deduplicated() {
        let mut mappings = ResourceMappings::new();
        mappings
            .resource("items")
            .get()
            .produces(["a/b"])
            .unwrap()
            .produces(["a/b", "c/d"])
            .unwrap();

        let handlers = mappings.get("items").unwrap().handlers("get");
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].produces, Some(strings(&["a/b", "c/d"])));
    }

    #[test]
    fn test_invalid_mime_type_is_rejected() {
        let mut mappings = ResourceMappings::new();
        let error = mappings.resource("items").post().consumes(["application/json", "json"]).err();

        assert_eq!(error, Some(MappingError::InvalidMimeType("json".to_string())));
        assert_eq!(mappings.get("items").unwrap().handlers("post")[0].consumes, None);
    }

    #[test]
    fn test_registration_merges_equal_constraints() {
        let mut resource = Resource::new("items");
        resource.method("GET", HandlerConfiguration::new().with_produces(["a/b", "c/d"]));
        resource.method("get", HandlerConfiguration::serving(ok).with_produces(["a/b", "c/d"]));

        assert_eq!(resource.handlers("get").len(), 1);
        assert!(resource.handlers("get")[0].is_dispatchable());

        // Same types in another order are another entry.
        resource.method("get", HandlerConfiguration::serving(ok).with_produces(["c/d", "a/b"]));
        assert_eq!(resource.handlers("get").len(), 2);

        // No constraints at all is yet another identity than an empty list.
        resource.method("get", HandlerConfiguration::serving(ok));
        resource.method("get", HandlerConfiguration::serving(ok).with_produces(Vec::<String>::new()));
        assert_eq!(resource.handlers("get").len(), 4);
    }

    #[test]
    fn test_methods_returns_one_accessor_per_entry() {
        let mut resource = Resource::new("items");
        let accessors = resource.methods(
            "post",
            vec![
                HandlerConfiguration::new().with_consumes(["application/json"]),
                HandlerConfiguration::serving(ok).with_consumes(["application/json"]),
                HandlerConfiguration::serving(ok).with_consumes(["text/csv"]),
            ],
        );
        assert_eq!(accessors.len(), 2);
        assert_eq!(resource.handlers("POST").len(), 2);
    }

    #[test]
    fn test_resource_with_configuration() {
        let mut mappings = ResourceMappings::new();
        mappings.resource_with(
            "orders/{id}",
            [
                ("GET", vec![HandlerConfiguration::serving(ok).with_produces(["application/json"])]),
                ("Delete", vec![HandlerConfiguration::serving(ok)]),
            ],
        );
        // An existing resource is left as it is.
        mappings.resource_with("orders/{id}", [("put", vec![HandlerConfiguration::serving(ok)])]);

        let resource = mappings.get("orders/{id}").unwrap();
        assert_eq!(resource.path(), "orders/{id}");
        assert_eq!(resource.verbs().collect::<Vec<_>>(), vec!["delete", "get"]);
        assert!(!resource.handles("put"));
    }

    #[test]
    fn test_find_by_exact_constraints() {
        let mut mappings = ResourceMappings::new();
        mappings
            .resource("items")
            .get()
            .produces(["application/json"])
            .unwrap()
            .serve(ok);
        mappings.resource("items").post().serve(ok);

        let json = strings(&["application/json"]);
        assert!(mappings.find("items", Some("GET"), None, Some(json.as_slice())).is_some());
        assert!(mappings.find("items", None, None, Some(json.as_slice())).is_some());
        assert!(mappings.find("items", Some("post"), None, None).is_some());
        assert!(mappings.find("items", Some("get"), None, None).is_none());
        assert!(mappings.find("other", None, None, None).is_none());

        let mut resource = mappings.get("items").unwrap().clone();
        let entry = resource.find_mut(Some("post"), None, None).unwrap();
        entry.consumes(["text/csv"]).unwrap();
        let csv = strings(&["text/csv"]);
        assert!(resource.find(Some("post"), Some(csv.as_slice()), None).is_some());
    }

    #[test]
    fn test_disable_removes_only_exact_entries() {
        let mut resource = Resource::new("items");
        resource.method("get", HandlerConfiguration::serving(ok).with_produces(["application/json"]));
        resource.method("get", HandlerConfiguration::serving(ok).with_produces(["text/plain"]));
        resource.method("get", HandlerConfiguration::serving(ok).with_produces(["application/json", "text/plain"]));
        resource.method("post", HandlerConfiguration::serving(ok).with_produces(["application/json"]));

        let json = strings(&["application/json"]);
        resource.disable(Some("get"), None, Some(json.as_slice()));

        let remaining: Vec<_> = resource
            .handlers("get")
            .iter()
            .map(|entry| entry.produces.clone().unwrap())
            .collect();
        assert_eq!(remaining, vec![strings(&["text/plain"]), strings(&["application/json", "text/plain"])]);
        assert_eq!(resource.handlers("post").len(), 1);

        // Without a verb every table is searched.
        resource.disable(None, None, Some(json.as_slice()));
        assert!(resource.handlers("post").is_empty());
        assert!(resource.handles("post"));
    }

    #[test]
    fn test_mappings_disable_unknown_resource() {
        let mut mappings = ResourceMappings::new();
        let error = mappings.disable("missing", Some("get"), None, None).err();
        assert_eq!(error, Some(MappingError::UnknownResource("missing".to_string())));
    }

    #[test]
    fn test_readonly_keeps_read_verbs() {
        let mut mappings = ResourceMappings::new();
        let resource = mappings.resource("items");
        resource.get().serve(ok);
        resource.post().serve(ok);
        resource.put().serve(ok);
        resource.method("head", HandlerConfiguration::serving(ok));
        resource.delete().serve(ok);
        resource.patch().serve(ok);

        mappings.readonly();

        let verbs: Vec<_> = mappings.get("items").unwrap().verbs().collect();
        assert_eq!(verbs, vec!["get", "head"]);
    }

    #[test]
    fn test_describe_mappings() {
        let mut mappings = ResourceMappings::new();
        mappings
            .resource("users")
            .get()
            .produces(["application/json"])
            .unwrap()
            .serve(ok);
        mappings
            .resource("users")
            .post()
            .consumes(["application/json"])
            .unwrap()
            .before(ok)
            .serve(ok)
            .finally(ok);

        let described = serde_json::to_value(mappings.describe()).unwrap();
        assert_eq!(
            described,
            json!({
                "users": {
                    "get": [{ "produces": ["application/json"], "before": false, "serve": true, "catch": false, "finally": false }],
                    "post": [{ "consumes": ["application/json"], "before": true, "serve": true, "catch": false, "finally": true }]
                }
            })
        );
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings.paths().collect::<Vec<_>>(), vec!["users"]);
    }

    // Dispatch

    #[test]
    fn test_dispatch_prefers_literal_resource() {
        let mut mappings = ResourceMappings::new();
        mappings.resource("").get().serve(|exchange| {
            exchange.send_text(StatusCode::Ok, "list");
            Ok(())
        });
        mappings.resource("{id}").get().serve(|exchange| {
            let id = exchange.path_parameter("id").unwrap_or_default().to_string();
            exchange.send_text(StatusCode::Ok, &format!("entity {id}"));
            Ok(())
        });
        mappings.resource("count").get().serve(|exchange| {
            exchange.send_text(StatusCode::Ok, "count");
            Ok(())
        });
        let controller = HttpController::new(mappings);

        let (response, _) = dispatch(&controller, &request(Method::GET, "count", &[]));
        assert_eq!(response.body_text(), "count");

        let (response, _) = dispatch(&controller, &request(Method::GET, "/17", &[]));
        assert_eq!(response.body_text(), "entity 17");

        let (response, _) = dispatch(&controller, &request(Method::GET, "/", &[]));
        assert_eq!(response.body_text(), "list");
    }

    #[test]
    fn test_routing_only_considers_resources_with_the_verb() {
        let mut mappings = ResourceMappings::new();
        mappings.resource("count").post().serve(ok);
        mappings.resource("{id}").get().serve(|exchange| {
            exchange.send_text(StatusCode::Ok, "entity");
            Ok(())
        });
        let controller = HttpController::new(mappings);

        let (response, _) = dispatch(&controller, &request(Method::GET, "/count", &[]));
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.body_text(), "entity");
    }

    #[test]
    fn test_consumes_negotiation() {
        let mut mappings = ResourceMappings::new();
        mappings
            .resource("orders")
            .post()
            .consumes(["*/json"])
            .unwrap()
            .serve(|exchange| {
                let order = exchange.request.json_value()?;
                exchange.send_json(StatusCode::Created, &json!({ "received": order["sku"] }))
            });
        let controller = HttpController::new(mappings);

        let mut accepted = request(Method::POST, "/orders", &[("Content-Type", "application/json; charset=utf-8")]);
        accepted.body = br#"{"sku":"A-1"}"#.to_vec();
        let (response, outcome) = dispatch(&controller, &accepted);
        assert!(outcome.is_ok());
        assert_eq!(response.status, StatusCode::Created);
        assert_eq!(response.body_json().unwrap(), json!({ "received": "A-1" }));

        let rejected = request(Method::POST, "/orders", &[("Content-Type", "text/xml")]);
        let (response, outcome) = dispatch(&controller, &rejected);
        assert!(outcome.is_ok());
        assert_eq!(response.status, StatusCode::BadRequest);
        assert_eq!(
            response.body_json().unwrap(),
            json!({ "code": null, "error": "Bad Request", "details": "No suitable processor for this request." })
        );

        let missing = request(Method::POST, "/orders", &[]);
        let (response, _) = dispatch(&controller, &missing);
        assert_eq!(response.status, StatusCode::BadRequest);
    }

    #[test]
    fn test_produces_negotiation() {
        let mut mappings = ResourceMappings::new();
        mappings
            .resource("report")
            .get()
            .produces(["application/json"])
            .unwrap()
            .serve(|exchange| exchange.send_json(StatusCode::Ok, &json!({ "format": "json" })));
        mappings
            .resource("report")
            .get()
            .produces(["text/csv"])
            .unwrap()
            .serve(|exchange| {
                exchange.send_text(StatusCode::Ok, "format\ncsv");
                Ok(())
            });
        let controller = HttpController::new(mappings);

        // The first compatible entry in registration order wins.
        let (response, _) = dispatch(&controller, &request(Method::GET, "/report", &[("Accept", "*/*")]));
        assert_eq!(response.header("Content-Type"), Some("application/json"));

        let (response, _) = dispatch(&controller, &request(Method::GET, "/report", &[]));
        assert_eq!(response.header("Content-Type"), Some("application/json"));

        let (response, _) = dispatch(
            &controller,
            &request(Method::GET, "/report", &[("Accept", "text/html;q=0.9, text/*;q=0.8")]),
        );
        assert_eq!(response.body_text(), "format\ncsv");

        let (response, _) = dispatch(&controller, &request(Method::GET, "/report", &[("Accept", "image/png")]));
        assert_eq!(response.status, StatusCode::BadRequest);
    }

    #[test]
    fn test_entries_without_serve_are_not_dispatched() {
        let mut mappings = ResourceMappings::new();
        mappings.resource("items").get().produces(["application/json"]).unwrap();
        let (controller, phases) = observed(HttpController::new(mappings));

        let (response, outcome) = dispatch(&controller, &request(Method::GET, "/items", &[]));
        assert!(outcome.is_ok());
        assert_eq!(response.status, StatusCode::BadRequest);
        assert_eq!(*phases.lock().unwrap(), vec![Phase::Routing, Phase::MimeMatching]);
    }

    #[test]
    fn test_emptied_verb_table_still_routes() {
        let mut mappings = ResourceMappings::new();
        mappings.resource("count").get().serve(ok);
        mappings.resource("{id}").get().serve(ok);
        mappings.disable("count", Some("get"), None, None).unwrap();
        let controller = HttpController::new(mappings);

        let (response, _) = dispatch(&controller, &request(Method::GET, "/count", &[]));
        assert_eq!(response.status, StatusCode::BadRequest);
    }

    #[test]
    fn test_context_carries_path_and_query_parameters() {
        let mut mappings = ResourceMappings::new();
        mappings.resource("users/{id}/files/{path*}").get().serve(|exchange| {
            let body = json!({
                "id": exchange.path_parameter("id"),
                "path": exchange.path_parameter("path"),
                "verbose": exchange.query_parameter("verbose"),
            });
            exchange.send_json(StatusCode::Ok, &body)
        });
        let controller = HttpController::new(mappings);

        let (response, _) = dispatch(
            &controller,
            &request(Method::GET, "/users/7/files/a/b.txt?verbose=true", &[]),
        );
        assert_eq!(
            response.body_json().unwrap(),
            json!({ "id": "7", "path": "a/b.txt", "verbose": "true" })
        );
    }

    #[test]
    fn test_lifecycle_order() {
        let calls = events();
        let mut mappings = ResourceMappings::new();
        mappings
            .resource("items")
            .get()
            .before(record(&calls, "before"))
            .serve(record(&calls, "serve"))
            .catch({
                let calls = Arc::clone(&calls);
                move |_: &mut Exchange<'_>, _: HandlerError| {
                    calls.lock().unwrap().push("catch");
                    Ok(())
                }
            })
            .finally(record(&calls, "finally"));
        let (controller, phases) = observed(HttpController::new(mappings));

        let (response, outcome) = dispatch(&controller, &request(Method::GET, "/items", &[]));
        assert!(outcome.is_ok());
        assert!(response.is_closed());
        assert_eq!(recorded(&calls), vec!["before", "serve", "finally"]);
        assert_eq!(
            *phases.lock().unwrap(),
            vec![Phase::Routing, Phase::MimeMatching, Phase::Before, Phase::Serve, Phase::Finally, Phase::Done]
        );
    }

    #[test]
    fn test_committed_response_skips_serve() {
        let calls = events();
        let mut mappings = ResourceMappings::new();
        mappings
            .resource("items")
            .get()
            .before(|exchange| {
                exchange.send_text(StatusCode::Unauthorized, "login first");
                exchange.response.close();
                Ok(())
            })
            .serve(record(&calls, "serve"))
            .finally(record(&calls, "finally"));
        let (controller, phases) = observed(HttpController::new(mappings));

        let (response, outcome) = dispatch(&controller, &request(Method::GET, "/items", &[]));
        assert!(outcome.is_ok());
        assert_eq!(response.status, StatusCode::Unauthorized);
        assert_eq!(response.body_text(), "login first");
        assert_eq!(recorded(&calls), vec!["finally"]);
        assert!(!phases.lock().unwrap().contains(&Phase::Serve));
    }

    #[test]
    fn test_default_catch_answers_internal_server_error() {
        let calls = events();
        let mut mappings = ResourceMappings::new();
        mappings
            .resource("items")
            .get()
            .serve(|_| Err(HandlerError::new("TypeError", "value is undefined")))
            .finally(record(&calls, "finally"));
        let (controller, phases) = observed(HttpController::new(mappings));

        let (response, outcome) = dispatch(&controller, &request(Method::GET, "/items", &[]));
        assert!(outcome.is_ok());
        assert_eq!(response.status, StatusCode::InternalServerError);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(
            response.body_json().unwrap(),
            json!({ "code": null, "error": "TypeError", "details": "value is undefined" })
        );
        assert_eq!(recorded(&calls), vec!["finally"]);
        assert!(phases.lock().unwrap().contains(&Phase::Catch));
    }

    #[test]
    fn test_error_status_from_conversions() {
        let mut mappings = ResourceMappings::new();
        mappings.resource("orders").post().serve(|exchange| {
            let order = exchange.request.json_value()?;
            exchange.send_json(StatusCode::Created, &order)
        });
        let controller = HttpController::new(mappings);

        let mut malformed = request(Method::POST, "/orders", &[]);
        malformed.body = b"{not json".to_vec();
        let (response, outcome) = dispatch(&controller, &malformed);
        assert!(outcome.is_ok());
        assert_eq!(response.status, StatusCode::BadRequest);
        assert_eq!(response.body_json().unwrap()["error"], "Error");
    }

    #[test]
    fn test_unserializable_response_is_server_error() {
        let mut mappings = ResourceMappings::new();
        mappings.resource("grid").get().serve(|exchange| {
            let cells: HashMap<(i32, i32), i32> = HashMap::from([((0, 0), 1)]);
            exchange.send_json(StatusCode::Ok, &cells)
        });
        let controller = HttpController::new(mappings);

        let (response, outcome) = dispatch(&controller, &request(Method::GET, "/grid", &[]));
        assert!(outcome.is_ok());
        assert_eq!(response.status, StatusCode::InternalServerError);
        assert_eq!(response.body_json().unwrap()["error"], "Error");
    }

    #[test]
    fn test_consumes_any_media_type() {
        let mut mappings = ResourceMappings::new();
        mappings
            .resource("notes")
            .post()
            .consumes(["*/*"])
            .unwrap()
            .serve(|exchange| {
                exchange.send_text(StatusCode::Created, "stored");
                Ok(())
            });
        let controller = HttpController::new(mappings);

        for content_type in ["application/json", "text/plain; charset=utf-8"] {
            let (response, outcome) = dispatch(
                &controller,
                &request(Method::POST, "/notes", &[("Content-Type", content_type)]),
            );
            assert!(outcome.is_ok());
            assert_eq!(response.status, StatusCode::Created);
            assert_eq!(response.body_text(), "stored");
        }
    }

    #[test]
    fn test_verb_shortcuts_take_serve_callback() {
        let mut mappings = ResourceMappings::new();
        mappings.resource("items").get_with(|exchange| {
            exchange.send_text(StatusCode::Ok, "listed");
            Ok(())
        });
        mappings
            .resource("items")
            .post_with(|exchange| {
                exchange.send_text(StatusCode::Created, "created");
                Ok(())
            })
            .produces(["text/plain"])
            .unwrap();
        mappings.resource("items").serve_with("PUT", ok);
        mappings.resource("items/{id}").delete_with(ok);
        mappings.resource("items/{id}").patch_with(ok);
        mappings.resource("items/{id}").put_with(ok);

        let resource = mappings.get("items").unwrap();
        assert_eq!(resource.verbs().collect::<Vec<_>>(), vec!["get", "post", "put"]);
        let resource = mappings.get("items/{id}").unwrap();
        assert_eq!(resource.verbs().collect::<Vec<_>>(), vec!["delete", "patch", "put"]);

        let controller = HttpController::new(mappings);
        let (response, _) = dispatch(&controller, &request(Method::GET, "/items", &[]));
        assert_eq!(response.body_text(), "listed");
        let (response, _) = dispatch(&controller, &request(Method::POST, "/items", &[("Accept", "text/plain")]));
        assert_eq!(response.status, StatusCode::Created);
        assert_eq!(response.body_text(), "created");
    }

    #[test]
    fn test_context_fields_override_error() {
        let mut mappings = ResourceMappings::new();
        mappings.resource("items").post().before(|exchange| {
            exchange.context.http_error_code = Some(StatusCode::UnprocessableEntity);
            exchange.context.error_code = Some("E42".to_string());
            Err(HandlerError::new("ValidationError", "quantity must be positive").with_code("ignored"))
        });
        mappings.resource("items").post().serve(ok);
        let controller = HttpController::new(mappings);

        let (response, _) = dispatch(&controller, &request(Method::POST, "/items", &[]));
        assert_eq!(response.status, StatusCode::UnprocessableEntity);
        assert_eq!(
            response.body_json().unwrap(),
            json!({ "code": "E42", "error": "ValidationError", "details": "quantity must be positive" })
        );
    }

    #[test]
    fn test_rejection_rendered_for_html_clients() {
        let mut mappings = ResourceMappings::new();
        mappings.resource("items/{id}").put().serve(|exchange| {
            let error = exchange.context.reject(StatusCode::Conflict, "Conflict", "item is locked");
            exchange.context.error_code = Some("E1".to_string());
            Err(error)
        });
        let controller = HttpController::new(mappings);

        let html = request(Method::PUT, "/items/3", &[("Accept", "text/html,application/xhtml+xml,*/*;q=0.8")]);
        let (response, _) = dispatch(&controller, &html);
        assert_eq!(response.status, StatusCode::Conflict);
        assert_eq!(response.header("Content-Type"), Some("text/plain"));
        assert_eq!(response.body_text(), "Conflict[E1]: item is locked");

        // `*/*` is compatible with `*/html` too.
        let any = request(Method::PUT, "/items/3", &[("Accept", "*/*")]);
        let (response, _) = dispatch(&controller, &any);
        assert_eq!(response.body_text(), "Conflict[E1]: item is locked");
    }

    #[test]
    fn test_custom_catch_handles_error() {
        let mut mappings = ResourceMappings::new();
        mappings
            .resource("items")
            .get()
            .serve(|_| Err(HandlerError::not_found("no such item")))
            .catch(|exchange, error| {
                let status = error.status().unwrap_or(StatusCode::InternalServerError);
                exchange.send_text(status, &format!("custom: {}", error.details()));
                Ok(())
            });
        let controller = HttpController::new(mappings);

        let (response, outcome) = dispatch(&controller, &request(Method::GET, "/items", &[]));
        assert!(outcome.is_ok());
        assert_eq!(response.status, StatusCode::NotFound);
        assert_eq!(response.body_text(), "custom: no such item");
    }

    #[test]
    fn test_failing_catch_propagates_after_finally() {
        let calls = events();
        let mut mappings = ResourceMappings::new();
        mappings
            .resource("items")
            .delete()
            .serve(|_| Err(HandlerError::message("first failure")))
            .catch(|_, _| Err(HandlerError::message("catch failure")))
            .finally(record(&calls, "finally"));
        let (controller, phases) = observed(HttpController::new(mappings));

        let (response, outcome) = dispatch(&controller, &request(Method::DELETE, "/items", &[]));
        match outcome {
            Err(DispatchError::CatchHandler { method, path, source }) => {
                assert_eq!(method, "DELETE");
                assert_eq!(path, "/items");
                assert_eq!(source.details(), "catch failure");
            }
            Ok(()) => panic!("a failing catch must propagate"),
        }
        assert!(response.is_closed());
        assert_eq!(recorded(&calls), vec!["finally"]);
        assert_eq!(phases.lock().unwrap().last(), Some(&Phase::Done));
    }

    #[test]
    fn test_finally_failure_is_swallowed() {
        let mut mappings = ResourceMappings::new();
        mappings
            .resource("items")
            .get()
            .serve(|exchange| exchange.send_json(StatusCode::Ok, &json!([])))
            .finally(|exchange| {
                exchange.response.print("ignored after close");
                Err(HandlerError::message("cleanup failed"))
            });
        let controller = HttpController::new(mappings);

        let (response, outcome) = dispatch(&controller, &request(Method::GET, "/items", &[]));
        assert!(outcome.is_ok());
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.body_text(), "[]");
    }

    #[test]
    fn test_unmatched_request_skips_lifecycle() {
        let (controller, phases) = observed(HttpController::new(ResourceMappings::new()));

        let (response, outcome) = dispatch(&controller, &request(Method::GET, "/anything", &[]));
        assert!(outcome.is_ok());
        assert_eq!(response.status, StatusCode::BadRequest);
        assert!(response.is_closed());
        assert_eq!(*phases.lock().unwrap(), vec![Phase::Routing]);
    }

    #[test]
    fn test_handler_can_send_uniform_error() {
        let mut mappings = ResourceMappings::new();
        mappings.resource("secure").get().serve(|exchange| {
            if exchange.request.header("X-developer-key").is_none() {
                exchange.send_error(
                    StatusCode::Forbidden,
                    Some("E403"),
                    StatusCode::Forbidden.reason_phrase(),
                    Some("X-developer-key is missing from request headers"),
                );
            }
            Ok(())
        });
        let controller = HttpController::new(mappings);

        let (response, _) = dispatch(&controller, &request(Method::GET, "/secure", &[]));
        assert_eq!(response.status, StatusCode::Forbidden);
        assert_eq!(
            response.body_json().unwrap(),
            json!({ "code": "E403", "error": "Forbidden", "details": "X-developer-key is missing from request headers" })
        );
    }

    struct Greeter {
        calls: Events,
    }

    impl RouteHandler for Greeter {
        fn before(&self, _exchange: &mut Exchange<'_>) -> HandlerResult {
            self.calls.lock().unwrap().push("before");
            Ok(())
        }

        fn serve(&self, exchange: &mut Exchange<'_>) -> HandlerResult {
            let name = exchange.query_parameter("name").map(str::to_string);
            match name {
                Some(name) => {
                    exchange.send_text(StatusCode::Ok, &format!("Hello, {name}"));
                    Ok(())
                }
                None => Err(HandlerError::bad_request("name is required")),
            }
        }
    }

    #[test]
    fn test_route_handler_object() {
        let calls = events();
        let mut mappings = ResourceMappings::new();
        mappings.resource("greet").get().handler(Greeter {
            calls: Arc::clone(&calls),
        });
        let controller = HttpController::new(mappings);

        let (response, _) = dispatch(&controller, &request(Method::GET, "/greet?name=Ada", &[]));
        assert_eq!(response.body_text(), "Hello, Ada");

        let (response, _) = dispatch(&controller, &request(Method::GET, "/greet", &[]));
        assert_eq!(response.status, StatusCode::BadRequest);
        assert_eq!(
            response.body_json().unwrap(),
            json!({ "code": null, "error": "Bad Request", "details": "name is required" })
        );
        assert_eq!(recorded(&calls), vec!["before", "before"]);
    }

    #[test]
    fn test_controller_settings() {
        let controller = HttpController::new(ResourceMappings::new());
        assert_eq!(controller.log_target(), "microrest::controller");

        let controller = controller.with_log_target("orders::rest");
        assert_eq!(controller.log_target(), "orders::rest");
        assert!(controller.mappings().is_empty());
    }

    #[test]
    fn test_handler_error_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "orders.db missing");
        let error = HandlerError::from(io);

        assert_eq!(error.name(), "Error");
        assert_eq!(error.status(), None);
        assert!(!error.is_stack_suppressed());
        assert_eq!(error.chain().to_string(), "Error: orders.db missing\n  caused by: orders.db missing");

        let error = HandlerError::bad_request("missing id").with_code("E7");
        assert_eq!(error.to_string(), "Bad Request: missing id");
        assert_eq!(error.code(), Some("E7"));
        assert!(error.is_stack_suppressed());
    }

    #[test]
    fn test_request_trait_helpers() {
        let mut req = request(Method::POST, "/notes?draft", &[("content-type", "text/plain")]);
        req.body = b"hello".to_vec();

        assert_eq!(Request::method(&req), "POST");
        assert_eq!(req.content_type(), Some("text/plain"));
        assert_eq!(req.text().unwrap(), "hello");
        assert!(req.json_value().is_err());
        assert_eq!(req.query_parameters(), &HashMap::from([("draft".to_string(), String::new())]));
    }

    #[test]
    fn test_controller_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpController>();
    }

    #[test]
    fn test_response_trait_println() {
        let mut response = HttpResponse::default();
        response.println("line");
        response.set_content_type("text/plain");
        assert_eq!(response.body_text(), "line\n");
        assert_eq!(Response::status(&response), StatusCode::Ok);
        assert_eq!(response.header("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_callback_values_are_cloned_into_entries() {
        let calls = events();
        let mut mappings = ResourceMappings::new();
        mappings.resource("a").get().serve(record(&calls, "a"));
        let shared = mappings.get("a").unwrap().handlers("get")[0].clone();
        mappings.resource_with("b", [("get", vec![shared])]);
        let controller = HttpController::new(mappings);

        dispatch(&controller, &request(Method::GET, "/a", &[]));
        dispatch(&controller, &request(Method::GET, "/b", &[]));
        assert_eq!(recorded(&calls), vec!["a", "a"]);
    }
}
