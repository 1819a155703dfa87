mod common;

use common::{as_ref, Probe};
use hubkit::prelude::*;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::sync::Arc;

fn hello() -> Contract {
    Contract::new("Hello").method("hello")
}

fn speaker(name: &str, lang: &str) -> ComponentRef {
    let reply = format!("{lang}:{name}");
    as_ref(&Probe::with_members(
        name,
        Members::new().with_method("hello", move |_| json!(reply.clone())),
    ))
}

fn props(lang: &str) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("lg".to_string(), json!(lang));
    properties
}

type Log = Arc<Mutex<Vec<(ServiceEventKind, ServiceId, Option<String>)>>>;

fn watcher(hub: &Hub, listener: impl FnOnce(ServiceListener) -> ServiceListener) -> Log {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    hub.register_service_listener(listener(ServiceListener::new(move |event: &ServiceEvent| {
        let reference = event.reference();
        sink.lock().push((
            event.kind(),
            reference.id(),
            reference.property_str("lg").map(str::to_owned),
        ));
    })));
    log
}

#[test]
fn service_lifecycle_with_stale_reference() {
    let hub = Hub::new();
    let component = speaker("en-speaker", "en");
    hub.register_component(component.clone()).unwrap();

    let registration = hub
        .register_service_with(&hello(), &component, props("en"))
        .unwrap();
    let reference = hub.get_service_reference(&hello()).unwrap();

    assert!(reference.is_same(&registration.reference()));
    assert!(same_component(&reference.service().unwrap(), &component));
    assert_eq!(reference.property_str("lg"), Some("en"));
    assert_eq!(
        reference.property(SERVICE_PUBLISHER).unwrap(),
        Some(&json!("en-speaker"))
    );
    assert_eq!(
        reference.property(SERVICE_CONTRACT).unwrap(),
        Some(&json!("Hello"))
    );

    hub.unregister_service(&registration).unwrap();

    assert!(!registration.is_registered());
    assert!(!reference.is_valid());
    assert!(matches!(
        reference.service(),
        Err(HubError::StaleServiceReference(id)) if id == registration.id()
    ));
    assert!(matches!(
        reference.properties(),
        Err(HubError::StaleServiceReference(_))
    ));
    assert!(hub.get_service_reference(&hello()).is_none());
    assert!(hub.get_service(&hello()).is_none());
}

#[test]
fn double_unregister_fails() {
    let hub = Hub::new();
    let component = speaker("s", "en");
    let registration = hub.register_service(&hello(), &component).unwrap();

    hub.unregister_service(&registration).unwrap();
    assert!(matches!(
        hub.unregister_service(&registration),
        Err(HubError::UnknownServiceRegistration(_))
    ));
}

#[test]
fn reserved_properties_override_caller_values() {
    let hub = Hub::new();
    let component = speaker("s", "en");
    let mut properties = props("en");
    properties.insert(SERVICE_ID.to_string(), json!("forged"));

    let registration = hub
        .register_service_with(&hello(), &component, properties)
        .unwrap();

    assert_eq!(
        registration.properties().get(SERVICE_ID),
        Some(&json!(registration.id().0))
    );
}

#[test]
fn ids_are_unique_and_increasing() {
    let hub = Hub::new();
    let a = hub.register_service(&hello(), &speaker("a", "en")).unwrap();
    let b = hub.register_service(&hello(), &speaker("b", "fr")).unwrap();
    assert!(b.id() > a.id());
}

#[test]
fn invalid_registrations_are_rejected() {
    let hub = Hub::new();
    let component = speaker("s", "en");
    let mute = as_ref(&Probe::new("mute"));

    assert!(matches!(
        hub.register_service(&Contract::new(""), &component),
        Err(HubError::InvalidServiceRegistration(_))
    ));
    assert!(matches!(
        hub.register_service(&hello(), &mute),
        Err(HubError::InvalidServiceRegistration(_))
    ));
    assert!(hub.get_service_references(None).is_empty());
}

#[test]
fn contract_verification_can_be_disabled() {
    let hub = Hub::with_config(HubConfig {
        verify_service_contracts: false,
        ..HubConfig::default()
    });
    let mute = as_ref(&Probe::new("mute"));
    assert!(hub.register_service(&hello(), &mute).is_ok());
}

#[test]
fn lookups_filter_by_contract_and_predicate() {
    let hub = Hub::new();
    let other = Contract::new("Other");
    hub.register_service_with(&hello(), &speaker("en", "en"), props("en"))
        .unwrap();
    hub.register_service_with(&hello(), &speaker("fr", "fr"), props("fr"))
        .unwrap();
    hub.register_service(&other, &speaker("x", "x")).unwrap();

    assert_eq!(hub.get_service_references(None).len(), 3);
    assert_eq!(hub.get_service_references(Some(&hello())).len(), 2);

    let french = hub.get_service_references_matching(Some(&hello()), |r| {
        r.property_str("lg") == Some("fr")
    });
    assert_eq!(french.len(), 1);
    let service = french[0].service().unwrap();
    assert_eq!(invoke(&service, "hello", &[]).unwrap(), "fr:fr");

    let all: Vec<Value> = hub
        .get_services(&hello())
        .iter()
        .map(|service| invoke(service, "hello", &[]).unwrap())
        .collect();
    assert_eq!(all, vec![json!("en:en"), json!("fr:fr")]);
}

#[test]
fn listeners_hear_arrivals_and_departures() {
    let hub = Hub::new();
    let everything = watcher(&hub, |l| l);
    let hellos = watcher(&hub, |l| l.contract(hello()));
    let french = watcher(&hub, |l| {
        l.contract(hello())
            .filter(|r| r.property_str("lg") == Some("fr"))
    });

    let en = hub
        .register_service_with(&hello(), &speaker("en", "en"), props("en"))
        .unwrap();
    let fr = hub
        .register_service_with(&hello(), &speaker("fr", "fr"), props("fr"))
        .unwrap();
    hub.register_service(&Contract::new("Other"), &speaker("x", "x"))
        .unwrap();
    hub.unregister_service(&fr).unwrap();
    hub.unregister_service(&en).unwrap();

    assert_eq!(everything.lock().len(), 5);
    assert_eq!(hellos.lock().len(), 4);
    assert_eq!(
        *french.lock(),
        vec![
            (ServiceEventKind::Registered, fr.id(), Some("fr".to_string())),
            (ServiceEventKind::Unregistering, fr.id(), Some("fr".to_string())),
        ]
    );
}

#[test]
fn removed_service_listener_hears_nothing() {
    let hub = Hub::new();
    let calls = Arc::new(Mutex::new(0));
    let counter = calls.clone();
    let id = hub.register_service_listener(ServiceListener::new(move |_| *counter.lock() += 1));

    assert!(hub.unregister_service_listener(id));
    assert!(!hub.unregister_service_listener(id));
    hub.register_service(&hello(), &speaker("s", "en")).unwrap();
    assert_eq!(*calls.lock(), 0);
}

#[test]
fn unregistering_a_component_withdraws_its_services() {
    let hub = Hub::new();
    let component = speaker("publisher", "en");
    hub.register_component(component.clone()).unwrap();
    let first = hub.register_service(&hello(), &component).unwrap();
    let second = hub
        .register_service(&Contract::new("Other"), &component)
        .unwrap();
    let log = watcher(&hub, |l| l);

    hub.unregister_component("publisher").unwrap();

    assert!(!first.is_registered());
    assert!(!second.is_registered());
    let kinds: Vec<_> = log.lock().iter().map(|(kind, id, _)| (*kind, *id)).collect();
    assert_eq!(
        kinds,
        vec![
            (ServiceEventKind::Unregistering, first.id()),
            (ServiceEventKind::Unregistering, second.id()),
        ]
    );
    assert!(hub.get_service_references(None).is_empty());
}

#[test]
fn reset_invalidates_references_without_reusing_ids() {
    let hub = Hub::new();
    let before = hub.register_service(&hello(), &speaker("a", "en")).unwrap();
    let reference = before.reference();

    hub.reset();

    assert!(!reference.is_valid());
    assert!(hub.get_service_references(None).is_empty());
    let after = hub.register_service(&hello(), &speaker("b", "en")).unwrap();
    assert!(after.id() > before.id());
}

#[test]
fn listener_may_register_services_while_notified() {
    let hub = Hub::new();
    let inner = hub.clone();
    let echo = Contract::new("Echo");
    let echo_for_listener = echo.clone();
    hub.register_service_listener(ServiceListener::new(move |event| {
        if event.kind() == ServiceEventKind::Registered
            && event.reference().contract().name() == "Hello"
        {
            let component = event.reference().service().unwrap();
            inner.register_service(&echo_for_listener, &component).unwrap();
        }
    }));

    hub.register_service(&hello(), &speaker("s", "en")).unwrap();
    assert_eq!(hub.get_service_references(Some(&echo)).len(), 1);
}

#[test]
fn publisher_is_still_plugged_while_its_services_depart() {
    let hub = Hub::new();
    let component = speaker("publisher", "en");
    hub.register_component(component.clone()).unwrap();
    hub.register_service(&hello(), &component).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let inner = hub.clone();
    hub.register_service_listener(ServiceListener::new(move |event| {
        if event.kind() == ServiceEventKind::Unregistering {
            let publisher = inner.get_component("publisher");
            let name = publisher.as_ref().and_then(|p| inner.component_name(p));
            sink.lock().push(name);
        }
    }));

    hub.unregister_component("publisher").unwrap();

    assert_eq!(*seen.lock(), vec![Some("publisher".to_string())]);
    assert!(hub.get_component("publisher").is_none());
}

#[test]
fn reentrant_unregister_of_a_leaving_component_is_ignored() {
    let hub = Hub::new();
    let component = speaker("publisher", "en");
    hub.register_component(component.clone()).unwrap();
    hub.register_service(&hello(), &component).unwrap();

    let inner = hub.clone();
    hub.register_service_listener(ServiceListener::new(move |_| {
        inner.unregister_component("publisher").unwrap();
    }));

    hub.unregister_component("publisher").unwrap();

    assert!(hub.get_components().is_empty());
    assert!(hub.get_service_references(None).is_empty());
}

#[test]
fn lookup_ignores_member_declaration_order() {
    let hub = Hub::new();
    let declared = Contract::new("K").method("a").field("b");
    let reordered = Contract::new("K").field("b").method("a");
    let component = as_ref(&Probe::with_members(
        "k",
        Members::new().with_method("a", |_| json!(null)).with_field("b", 1),
    ));
    let registration = hub.register_service(&declared, &component).unwrap();

    let found = hub.get_service_reference(&reordered).unwrap();
    assert!(found.is_same(&registration.reference()));
    assert_eq!(hub.get_services(&reordered).len(), 1);
}
