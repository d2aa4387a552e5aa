//! Load testing for the hub: many concurrent clients against a ceiling.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tcp_hub::HubEvent;

mod common;

use common::{closed_by_hub, next_event, start_hub, Client, HubSetup};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_respect_ceiling() {
    let ceiling = 25;
    let clients = 60;
    let mut hub = start_hub(HubSetup {
        allowed_connections: ceiling,
        ..HubSetup::default()
    })
    .await;

    let start = Instant::now();
    let tasks: Vec<_> = (0..clients)
        .map(|_| {
            let addr = hub.addr;
            tokio::spawn(async move { Client::connect(addr, true).await })
        })
        .collect();

    let mut connected = Vec::with_capacity(clients);
    for task in tasks {
        connected.push(task.await.unwrap());
    }

    let mut accepted = HashSet::new();
    let mut rejected = HashSet::new();
    while accepted.len() + rejected.len() < clients {
        match next_event(&mut hub.events).await {
            HubEvent::Accepted(endpoint) => assert!(accepted.insert(endpoint)),
            HubEvent::Rejected(endpoint) => assert!(rejected.insert(endpoint)),
            HubEvent::Connected(_) => {}
            other => panic!("unexpected event {:?}", other),
        }
        assert!(hub.server.count() <= ceiling);
    }
    let elapsed = start.elapsed();

    println!("Load Test Results:");
    println!("  Clients:  {}", clients);
    println!("  Accepted: {}", accepted.len());
    println!("  Rejected: {}", rejected.len());
    println!("  Elapsed:  {:?}", elapsed);

    assert_eq!(accepted.len(), ceiling);
    assert_eq!(rejected.len(), clients - ceiling);
    assert_eq!(hub.server.count(), ceiling);

    // Every admitted client can still talk; rejected ones were closed.
    for client in connected.iter_mut() {
        if accepted.contains(&client.endpoint) {
            client.send(b"ping").await;
        } else {
            assert!(closed_by_hub(client).await);
        }
    }

    let mut messages = 0;
    while messages < ceiling {
        if let HubEvent::MessageReceived(message) = next_event(&mut hub.events).await {
            assert!(accepted.contains(&message.sender));
            messages += 1;
        }
    }

    hub.server.shutdown().await;
    assert_eq!(hub.server.count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_churn_returns_every_slot() {
    let mut hub = start_hub(HubSetup {
        allowed_connections: 8,
        ..HubSetup::default()
    })
    .await;

    for _round in 0..5 {
        let mut batch = Vec::new();
        for _ in 0..8 {
            batch.push(Client::connect(hub.addr, true).await);
        }
        let mut admitted = 0;
        while admitted < 8 {
            if let HubEvent::Accepted(_) = next_event(&mut hub.events).await {
                admitted += 1;
            }
        }

        drop(batch);
        let mut gone = 0;
        while gone < 8 {
            if let HubEvent::Disconnected(_) = next_event(&mut hub.events).await {
                gone += 1;
            }
        }
        assert_eq!(hub.server.count(), 0);
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(hub.server.count(), 0);
    hub.server.shutdown().await;
}
