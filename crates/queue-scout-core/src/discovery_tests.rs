use super::*;
use queue_transport::{HostSeed, InMemoryConfig, InMemoryTransport, QueueSeed};

fn sample_topology() -> InMemoryConfig {
    InMemoryConfig {
        hosts: vec![HostSeed::new("mq-01")
            .with_queue(
                QueueSeed::new("orders")
                    .with_messages(3)
                    .with_journal_messages(2),
            )
            .with_queue(QueueSeed {
                deny_journal_access: true,
                ..QueueSeed::new("audit").with_messages(1)
            })
            .with_queue(QueueSeed {
                deny_access: true,
                ..QueueSeed::new("locked")
            })
            .with_queue(QueueSeed {
                system: true,
                ..QueueSeed::new("admin_queue$")
            })],
    }
}

fn discovery_over(config: InMemoryConfig) -> (QueueDiscoveryService, Arc<InMemoryTransport>) {
    let transport = Arc::new(InMemoryTransport::new(config));
    let service = QueueDiscoveryService::new(transport.clone());
    (service, transport)
}

fn host(name: &str) -> CanonicalHost {
    CanonicalHost::normalize(name).unwrap()
}

fn snapshot<'a>(outcome: &'a DiscoveryOutcome, name: &str) -> &'a QueueSnapshot {
    outcome
        .snapshots
        .iter()
        .find(|snapshot| snapshot.name == name)
        .unwrap_or_else(|| panic!("queue {name} missing from discovery outcome"))
}

/// Tests for the enumeration pass
mod passes {
    use super::*;

    #[tokio::test]
    async fn returns_snapshots_in_name_order() {
        let (service, _) = discovery_over(sample_topology());

        let outcome = service.discover(&host("mq-01"), false).await.unwrap();

        let names: Vec<&str> = outcome
            .snapshots
            .iter()
            .map(|snapshot| snapshot.name.as_str())
            .collect();
        assert_eq!(names, vec!["audit", "locked", "orders"]);
    }

    #[tokio::test]
    async fn addresses_follow_the_direct_format() {
        let (service, _) = discovery_over(sample_topology());

        let outcome = service.discover(&host("MQ-01"), false).await.unwrap();

        let orders = snapshot(&outcome, "orders");
        assert_eq!(orders.path, "mq-01\\private$\\orders");
        assert_eq!(orders.format_name, "DIRECT=OS:mq-01\\private$\\orders");
        assert_eq!(
            orders.journal_address,
            "DIRECT=OS:mq-01\\private$\\orders;JOURNAL"
        );
    }

    #[tokio::test]
    async fn counts_come_from_the_live_queues() {
        let (service, _) = discovery_over(sample_topology());

        let outcome = service.discover(&host("mq-01"), false).await.unwrap();

        let orders = snapshot(&outcome, "orders");
        assert_eq!(orders.message_count, 3);
        assert_eq!(orders.journal_message_count, 2);
        assert!(orders.accessible);
        assert!(orders.error.is_none());
        assert_eq!(orders.category, QueueCategory::Private);
    }

    #[tokio::test]
    async fn unreadable_journal_defaults_to_zero_without_error() {
        let (service, _) = discovery_over(sample_topology());

        let outcome = service.discover(&host("mq-01"), false).await.unwrap();

        let audit = snapshot(&outcome, "audit");
        assert!(audit.accessible);
        assert!(audit.error.is_none());
        assert_eq!(audit.message_count, 1);
        assert_eq!(audit.journal_message_count, 0);
    }

    #[tokio::test]
    async fn denied_queue_is_reported_not_dropped() {
        let (service, _) = discovery_over(sample_topology());

        let outcome = service.discover(&host("mq-01"), false).await.unwrap();

        let locked = snapshot(&outcome, "locked");
        assert!(!locked.accessible);
        assert_eq!(locked.message_count, 0);
        let reason = locked.error.as_deref().unwrap();
        assert!(reason.contains("credentials"), "unexpected reason: {reason}");
    }

    #[tokio::test]
    async fn denied_queue_does_not_poison_its_neighbors() {
        let (service, _) = discovery_over(sample_topology());

        let outcome = service.discover(&host("mq-01"), false).await.unwrap();

        assert_eq!(outcome.snapshots.len(), 3);
        assert!(snapshot(&outcome, "orders").accessible);
        assert!(snapshot(&outcome, "audit").accessible);
    }
}

/// Tests for system queue filtering
mod system_filtering {
    use super::*;

    #[tokio::test]
    async fn excluded_system_queues_are_still_counted() {
        let (service, _) = discovery_over(sample_topology());

        let outcome = service.discover(&host("mq-01"), false).await.unwrap();

        assert_eq!(outcome.hidden_system_queues, 1);
        assert!(outcome
            .snapshots
            .iter()
            .all(|snapshot| snapshot.name != "admin_queue$"));
    }

    #[tokio::test]
    async fn included_system_queues_appear_with_their_category() {
        let (service, _) = discovery_over(sample_topology());

        let outcome = service.discover(&host("mq-01"), true).await.unwrap();

        assert_eq!(outcome.hidden_system_queues, 0);
        let admin = snapshot(&outcome, "admin_queue$");
        assert_eq!(admin.category, QueueCategory::System);
    }
}

/// Tests for enumeration failures
mod failures {
    use super::*;

    #[tokio::test]
    async fn unknown_host_fails_the_pass() {
        let (service, _) = discovery_over(sample_topology());

        let error = service.discover(&host("ghost"), false).await.unwrap_err();

        assert!(matches!(error, TransportError::NameResolution { .. }));
    }

    #[tokio::test]
    async fn offline_host_fails_the_pass() {
        let (service, transport) = discovery_over(sample_topology());
        transport.set_host_online("mq-01", false);

        let error = service.discover(&host("mq-01"), false).await.unwrap_err();

        assert!(matches!(error, TransportError::HostUnreachable { .. }));
    }

    #[tokio::test]
    async fn stopped_service_fails_the_pass() {
        let (service, transport) = discovery_over(sample_topology());
        transport.set_service_running("mq-01", false);

        let error = service.discover(&host("mq-01"), false).await.unwrap_err();

        assert!(matches!(error, TransportError::ServiceUnavailable { .. }));
    }
}

/// Tests for the guarded existence check
mod existence {
    use super::*;

    #[tokio::test]
    async fn present_queue_exists() {
        let (service, _) = discovery_over(sample_topology());
        let address = QueueAddress::parse("DIRECT=OS:mq-01\\private$\\orders").unwrap();

        assert!(service.exists(&address).await.unwrap());
    }

    #[tokio::test]
    async fn missing_queue_does_not_exist() {
        let (service, _) = discovery_over(sample_topology());
        let address = QueueAddress::parse("DIRECT=OS:mq-01\\private$\\nothing").unwrap();

        assert!(!service.exists(&address).await.unwrap());
    }

    #[tokio::test]
    async fn denied_queue_still_exists() {
        let (service, _) = discovery_over(sample_topology());
        let address = QueueAddress::parse("DIRECT=OS:mq-01\\private$\\locked").unwrap();

        assert!(service.exists(&address).await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_host_propagates_instead_of_answering() {
        let (service, transport) = discovery_over(sample_topology());
        transport.set_host_online("mq-01", false);
        let address = QueueAddress::parse("DIRECT=OS:mq-01\\private$\\orders").unwrap();

        let error = service.exists(&address).await.unwrap_err();

        assert!(matches!(error, TransportError::HostUnreachable { .. }));
    }
}
