use super::*;
use crate::{
    ingress::{CLUSTER_ISSUER_ANNOTATION, CONFIGURATION_SNIPPET_ANNOTATION},
    kinds::{business_moments, purchase_order, raw_data_log, simple},
};
use dolittle_platform_core::{
    request::{
        BusinessMomentsAdaptorExtra, BusinessMomentsConnector, IngressPath, PurchaseOrderApiExtra,
        RawDataLogIngestorExtra, SimpleExtra, WebhookAuthorization, WebhookEndpoint,
    },
    ApplicationInfo, CustomerTenantIngress, Kind, Tenant,
};
use dolittle_platform_k8s_api::{labels::Map, ObjectMeta};
use maplit::btreemap;
use pretty_assertions::assert_eq;

const APPLICATION_ID: &str = "cc142a0d-deac-4974-ada9-de6e21337dca";

fn microservice(kind: Kind) -> Microservice {
    Microservice {
        id: "c974e5a2-3f7c-4b25-a1b2-6d38b7c2a9a1".to_string(),
        name: "LeliaKim".to_string(),
        kind,
        tenant: Tenant {
            id: "4acf7a6e-6b1c-4a0d-9c8f-1f0b0e6e7a3d".to_string(),
            name: "JeanetteJohnston".to_string(),
        },
        application: ApplicationInfo {
            id: APPLICATION_ID.to_string(),
            name: "AlejandroRiley".to_string(),
        },
        environment: "AndreJensen".to_string(),
        resource_id: None,
    }
}

fn customer_tenant(id: &str, host: &str) -> CustomerTenantInfo {
    CustomerTenantInfo {
        customer_tenant_id: id.to_string(),
        alias: String::new(),
        environment: "AndreJensen".to_string(),
        ingress: CustomerTenantIngress {
            host: host.to_string(),
            domain_prefix: String::new(),
            secret_name: format!("{}-tls", host),
        },
        microservices_rel: Vec::new(),
        runtime_database_prefix: String::new(),
    }
}

fn simple_extra(is_public: bool) -> SimpleExtra {
    SimpleExtra {
        head_image: "dolittle/spinner:0.0.0".to_string(),
        runtime_image: "dolittle/runtime:5.6.0".to_string(),
        head_port: None,
        is_public,
        ingress: IngressPath {
            path: "/".to_string(),
            path_type: "Prefix".to_string(),
        },
        head_command: None,
    }
}

fn all_metadata(resources: &MicroserviceResources) -> Vec<&ObjectMeta> {
    let mut metas = vec![
        &resources.deployment.metadata,
        &resources.service.metadata,
        &resources.dolittle_config.metadata,
        &resources.env_variables.metadata,
        &resources.config_files.metadata,
        &resources.secret_env_variables.metadata,
    ];
    metas.extend(resources.network_policy.iter().map(|np| &np.metadata));
    metas.extend(resources.ingresses.iter().map(|i| &i.metadata));
    metas
}

#[test]
fn composes_the_example_microservice() {
    let ms = microservice(Kind::Simple);
    let tenants = vec![customer_tenant(
        "fake-customer-tenant-id-123",
        "leliakim.example.com",
    )];
    let resources = simple::resources(
        &ms,
        &simple_extra(true),
        &tenants,
        PlatformEnvironment::Prod,
    );

    let namespace = format!("application-{}", APPLICATION_ID);
    assert_eq!(resources.namespace, namespace);
    assert_eq!(
        resources.deployment.metadata.name.as_deref(),
        Some("andrejensen-leliakim")
    );
    assert_eq!(
        resources.deployment.metadata.namespace.as_deref(),
        Some(namespace.as_str())
    );

    let pod = resources
        .deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .expect("deployment must have a pod spec");
    let names = pod.containers.iter().map(|c| c.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["head", "runtime"]);
    let head_port = &pod.containers[0].ports.as_ref().unwrap()[0];
    assert_eq!(head_port.name.as_deref(), Some("http"));
    assert_eq!(head_port.container_port, 80);
    assert_eq!(head_image(pod), Some("dolittle/spinner:0.0.0"));

    assert_eq!(resources.ingresses.len(), 1);
    let ingress = &resources.ingresses[0];
    assert_eq!(
        ingress.metadata.name.as_deref(),
        Some("andrejensen-leliakim-fake-cu")
    );
    let tls = &ingress.spec.as_ref().unwrap().tls.as_ref().unwrap()[0];
    assert_eq!(tls.hosts, Some(vec!["leliakim.example.com".to_string()]));
    assert_eq!(tls.secret_name.as_deref(), Some("leliakim.example.com-tls"));
    let annotations = ingress.metadata.annotations.as_ref().unwrap();
    assert_eq!(
        annotations[CONFIGURATION_SNIPPET_ANNOTATION],
        "proxy_set_header Tenant-ID \"fake-customer-tenant-id-123\";\n"
    );
    assert_eq!(
        annotations[CLUSTER_ISSUER_ANNOTATION],
        "letsencrypt-production"
    );
}

#[test]
fn every_object_carries_the_identity_labels_and_annotations() {
    let ms = microservice(Kind::Simple);
    let tenants = vec![
        customer_tenant("aaaaaaa1-one", "one.example.com"),
        customer_tenant("bbbbbbb2-two", "two.example.com"),
    ];
    let resources = simple::resources(&ms, &simple_extra(true), &tenants, Default::default());

    let expected_labels: Map = btreemap! {
        "tenant".to_string() => "JeanetteJohnston".to_string(),
        "application".to_string() => "AlejandroRiley".to_string(),
        "environment".to_string() => "AndreJensen".to_string(),
        "microservice".to_string() => "LeliaKim".to_string(),
    };
    let expected_annotations: Map = btreemap! {
        "dolittle.io/tenant-id".to_string() => ms.tenant.id.clone(),
        "dolittle.io/application-id".to_string() => ms.application.id.clone(),
        "dolittle.io/microservice-id".to_string() => ms.id.clone(),
        "dolittle.io/microservice-kind".to_string() => "simple".to_string(),
    };

    let metas = all_metadata(&resources);
    assert_eq!(metas.len(), 9, "6 base objects, a network policy and 2 ingresses");
    for meta in metas {
        assert_eq!(meta.labels.as_ref(), Some(&expected_labels), "{:?}", meta.name);
        let annotations = meta.annotations.as_ref().expect("annotations must be set");
        for (k, v) in expected_annotations.iter() {
            assert_eq!(annotations.get(k), Some(v), "{:?} {}", meta.name, k);
        }
    }

    let selector = resources
        .service
        .spec
        .as_ref()
        .and_then(|s| s.selector.as_ref());
    assert_eq!(selector, Some(&expected_labels));
}

#[test]
fn composition_is_deterministic() {
    let ms = microservice(Kind::Simple);
    let tenants = vec![
        customer_tenant("aaaaaaa1-one", "one.example.com"),
        customer_tenant("bbbbbbb2-two", "two.example.com"),
    ];
    let a = simple::resources(&ms, &simple_extra(true), &tenants, Default::default());
    let b = simple::resources(&ms, &simple_extra(true), &tenants, Default::default());
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a.deployment).unwrap(),
        serde_json::to_string(&b.deployment).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&a.dolittle_config).unwrap(),
        serde_json::to_string(&b.dolittle_config).unwrap()
    );
}

#[test]
fn public_microservices_get_one_ingress_per_customer_tenant() {
    let ms = microservice(Kind::Simple);
    let tenants = vec![
        customer_tenant("aaaaaaa1-one", "one.example.com"),
        customer_tenant("bbbbbbb2-two", "two.example.com"),
        customer_tenant("ccccccc3-three", "three.example.com"),
    ];
    let resources = simple::resources(&ms, &simple_extra(true), &tenants, Default::default());
    assert_eq!(resources.ingresses.len(), tenants.len());
    assert!(resources.network_policy.is_some());

    let names = resources
        .ingresses
        .iter()
        .map(|i| i.metadata.name.clone().unwrap())
        .collect::<std::collections::BTreeSet<_>>();
    assert_eq!(names.len(), tenants.len(), "ingress names must be distinct");

    for (ingress, tenant) in resources.ingresses.iter().zip(tenants.iter()) {
        let spec = ingress.spec.as_ref().unwrap();
        let tls = &spec.tls.as_ref().unwrap()[0];
        assert_eq!(tls.hosts, Some(vec![tenant.ingress.host.clone()]));
        assert_eq!(tls.secret_name, Some(tenant.ingress.secret_name.clone()));
        let rule = &spec.rules.as_ref().unwrap()[0];
        assert_eq!(rule.host.as_ref(), Some(&tenant.ingress.host));
        let path = &rule.http.as_ref().unwrap().paths[0];
        assert_eq!(path.path.as_deref(), Some("/"));
        assert_eq!(path.path_type, "Prefix");
        let backend = path.backend.service.as_ref().unwrap();
        assert_eq!(backend.name, "andrejensen-leliakim");
        assert_eq!(backend.port.as_ref().unwrap().number, Some(80));
        assert_eq!(
            ingress.metadata.annotations.as_ref().unwrap()[CLUSTER_ISSUER_ANNOTATION],
            "letsencrypt-staging"
        );
    }
}

#[test]
fn private_microservices_get_no_ingress_or_network_policy() {
    let ms = microservice(Kind::Simple);
    let tenants = vec![customer_tenant("aaaaaaa1-one", "one.example.com")];
    let resources = simple::resources(&ms, &simple_extra(false), &tenants, Default::default());
    assert!(resources.ingresses.is_empty());
    assert!(resources.network_policy.is_none());
}

#[test]
fn runtime_mounts_the_dolittle_files() {
    let ms = microservice(Kind::Simple);
    let resources = simple::resources(&ms, &simple_extra(false), &[], Default::default());
    let pod = resources.deployment.spec.unwrap().template.spec.unwrap();
    let runtime = &pod.containers[1];
    let mounts = runtime
        .volume_mounts
        .as_ref()
        .unwrap()
        .iter()
        .map(|m| m.mount_path.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        mounts,
        vec![
            "/app/.dolittle/resources.json",
            "/app/.dolittle/event-horizons.json",
            "/app/.dolittle/event-horizon-consents.json",
            "/app/.dolittle/microservices.json",
            "/app/.dolittle/endpoints.json",
            "/app/.dolittle/appsettings.json",
            "/app/appsettings.json",
        ]
    );
    let ports = runtime
        .ports
        .as_ref()
        .unwrap()
        .iter()
        .map(|p| p.container_port)
        .collect::<Vec<_>>();
    assert_eq!(ports, vec![50052, 50053, 9700]);

    let service_ports = resources
        .service
        .spec
        .unwrap()
        .ports
        .unwrap()
        .into_iter()
        .map(|p| (p.name.unwrap(), p.port))
        .collect::<Vec<_>>();
    assert_eq!(
        service_ports,
        vec![("http".to_string(), 80), ("runtime".to_string(), 50052)]
    );
}

#[test]
fn head_port_and_command_are_configurable() {
    let ms = microservice(Kind::Simple);
    let mut extra = simple_extra(false);
    extra.head_port = Some(8000);
    extra.head_command = Some(dolittle_platform_core::request::HeadCommand {
        command: vec!["dotnet".to_string()],
        args: vec!["Server.dll".to_string()],
    });
    let resources = simple::resources(&ms, &extra, &[], Default::default());

    let target = resources.service.spec.as_ref().unwrap().ports.as_ref().unwrap()[0]
        .target_port
        .clone();
    assert_eq!(
        target,
        Some(k8s_openapi::apimachinery::pkg::util::intstr::IntOrString::Int(8000))
    );
    let head = &resources.deployment.spec.unwrap().template.spec.unwrap().containers[0];
    assert_eq!(head.command, Some(vec!["dotnet".to_string()]));
    assert_eq!(head.args, Some(vec!["Server.dll".to_string()]));
    assert_eq!(head.ports.as_ref().unwrap()[0].container_port, 8000);
}

#[test]
fn resources_are_partitioned_per_customer_tenant() {
    let ms = microservice(Kind::Simple);
    let mut prefixed = customer_tenant("bbbbbbb2-two", "two.example.com");
    prefixed.runtime_database_prefix = "Custom".to_string();
    let tenants = vec![customer_tenant("aaaaaaa1-one", "one.example.com"), prefixed];
    let resources = simple::resources(&ms, &simple_extra(false), &tenants, Default::default());

    let data = resources.dolittle_config.data.as_ref().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&data["resources.json"]).unwrap();
    assert_eq!(
        parsed["aaaaaaa1-one"]["eventStore"]["database"],
        "alejandroriley_andrejensen_leliakim_c974e5a_aaaaaaa_eventstore"
    );
    assert_eq!(
        parsed["bbbbbbb2-two"]["readModels"]["database"],
        "custom_c974e5a_bbbbbbb_readmodels"
    );
    assert_eq!(
        parsed["aaaaaaa1-one"]["readModels"]["host"],
        format!(
            "mongodb://andrejensen-mongo.application-{}.svc.cluster.local:27017",
            APPLICATION_ID
        )
    );

    let consents: serde_json::Value =
        serde_json::from_str(&data["event-horizon-consents.json"]).unwrap();
    assert_eq!(
        consents,
        serde_json::json!({ "aaaaaaa1-one": [], "bbbbbbb2-two": [] })
    );
}

#[test]
fn business_moments_adaptors_carry_their_connector() {
    let ms = microservice(Kind::BusinessMomentsAdaptor);
    let extra = BusinessMomentsAdaptorExtra {
        head_image: "dolittle/bma:1.0.0".to_string(),
        runtime_image: "dolittle/runtime:5.6.0".to_string(),
        ingress: IngressPath {
            path: "/bma".to_string(),
            path_type: "Prefix".to_string(),
        },
        connector: BusinessMomentsConnector::Webhook(WebhookAuthorization::Bearer {
            token: "t0k3n".to_string(),
        }),
    };
    let tenants = vec![customer_tenant("aaaaaaa1-one", "one.example.com")];
    let resources = business_moments::resources(&ms, &extra, &tenants, Default::default());

    assert_eq!(resources.ingresses.len(), 1);
    let connector: serde_json::Value = serde_json::from_str(
        &resources.config_files.data.as_ref().unwrap()[business_moments::CONNECTOR_FILE],
    )
    .unwrap();
    assert_eq!(connector["authorization"]["token"], "t0k3n");
    assert_eq!(
        resources.deployment.metadata.annotations.as_ref().unwrap()
            ["dolittle.io/microservice-kind"],
        "business-moments-adaptor"
    );
}

#[test]
fn raw_data_log_ingestors_override_the_head() {
    let ms = microservice(Kind::RawDataLogIngestor);
    let extra = RawDataLogIngestorExtra {
        head_image: "dolittle/platform-api:latest".to_string(),
        runtime_image: "dolittle/runtime:5.6.0".to_string(),
        ingress: IngressPath {
            path: "/api/webhooks".to_string(),
            path_type: "Prefix".to_string(),
        },
        write_to: "nats".to_string(),
        webhooks: vec![WebhookEndpoint {
            kind: "purchase-order".to_string(),
            uri_suffix: "purchase-order".to_string(),
            authorization: "Bearer abc".to_string(),
        }],
    };
    let resources = raw_data_log::resources(&ms, &extra, &[], Default::default());

    let head = &resources.deployment.spec.as_ref().unwrap().template.spec.as_ref().unwrap()
        .containers[0];
    assert_eq!(head.ports.as_ref().unwrap()[0].container_port, 8080);
    assert_eq!(head.command, Some(vec!["/app/bin/app".to_string()]));

    let env = resources.env_variables.data.as_ref().unwrap();
    assert_eq!(env["WEBHOOK_REPO"], "nats");
    assert_eq!(
        env["NATS_CLUSTER_URL"],
        format!(
            "andrejensen-nats.application-{}.svc.cluster.local:4222",
            APPLICATION_ID
        )
    );
    let webhooks: serde_json::Value = serde_json::from_str(
        &resources.config_files.data.as_ref().unwrap()[raw_data_log::WEBHOOKS_FILE],
    )
    .expect("webhooks.json must be valid JSON");
    assert_eq!(
        webhooks,
        serde_json::json!([{
            "kind": "purchase-order",
            "uriSuffix": "purchase-order",
            "authorization": "Bearer abc",
        }])
    );

    assert!(raw_data_log::is_valid_destination("stdout"));
    assert!(raw_data_log::is_valid_destination("my-nats"));
    assert!(!raw_data_log::is_valid_destination("kafka"));
}

#[test]
fn purchase_order_apis_are_private() {
    let ms = microservice(Kind::PurchaseOrderApi);
    let extra = PurchaseOrderApiExtra {
        head_image: "dolittle/purchase-order-api:1".to_string(),
        runtime_image: "dolittle/runtime:5.6.0".to_string(),
        webhooks: Vec::new(),
    };
    let tenants = vec![customer_tenant("aaaaaaa1-one", "one.example.com")];
    let resources = purchase_order::resources(&ms, &extra, &tenants, Default::default());
    assert!(resources.ingresses.is_empty());
    assert!(resources.network_policy.is_none());
    let env = resources.env_variables.data.as_ref().unwrap();
    assert_eq!(env["NATS_START_FROM_BEGINNING"], "false");
    assert!(env["DATABASE_READMODELS_URL"].starts_with("mongodb://andrejensen-mongo."));
    assert_eq!(
        resources.config_files.data.as_ref().unwrap()[purchase_order::WEBHOOKS_FILE],
        "[]"
    );
}
