/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod support;

use serde_json::json;
use sim_client::{Message, SubscribeOutcome, TopicHandler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use support::{init_logging, make_harness, test_config, Recorder};

#[tokio::test(flavor = "multi_thread")]
async fn resubscribe_routes_next_message_to_new_handler_only() {
    init_logging();
    let harness = make_harness("resubscribe", test_config()).await;
    let first = Recorder::default();
    let second = Recorder::default();

    let outcome = harness
        .client
        .subscribe("vehicle", first.handler())
        .await
        .expect("subscribe should succeed");
    assert_eq!(outcome, SubscribeOutcome::Started);

    harness
        .host
        .publish("vehicle", r#"{"seq":1}"#)
        .await
        .expect("publish should succeed");
    assert_eq!(first.wait_for(1).await.len(), 1);

    let outcome = harness
        .client
        .subscribe("vehicle", second.handler())
        .await
        .expect("resubscribe should succeed");
    assert_eq!(outcome, SubscribeOutcome::HandlerReplaced);

    harness
        .host
        .publish("vehicle", r#"{"seq":2}"#)
        .await
        .expect("publish should succeed");

    let received = second.wait_for(1).await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].get("seq"), Some(json!(2)));
    assert_eq!(first.messages().len(), 1);
    assert_eq!(harness.client.subscribed_topics().await, vec!["vehicle"]);

    harness.client.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn vehicle_updates_arrive_in_publication_order() {
    init_logging();
    let harness = make_harness("ordering", test_config()).await;
    let recorder = Recorder::default();
    harness
        .client
        .subscribe("vehicle", recorder.handler())
        .await
        .expect("subscribe should succeed");

    for speed in [10, 20, 30] {
        harness
            .host
            .publish_json("vehicle", &json!({"speed": speed}))
            .await
            .expect("publish should succeed");
    }

    let speeds: Vec<_> = recorder
        .wait_for(3)
        .await
        .iter()
        .map(|message| message.get("speed"))
        .collect();
    assert_eq!(speeds, vec![Some(json!(10)), Some(json!(20)), Some(json!(30))]);

    harness.client.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn binary_camera_frame_is_delivered_raw() {
    init_logging();
    let harness = make_harness("camera", test_config()).await;
    let recorder = Recorder::default();
    harness
        .client
        .subscribe("camera", recorder.handler())
        .await
        .expect("subscribe should succeed");

    let frame: &'static [u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];
    harness
        .host
        .publish("camera", frame)
        .await
        .expect("publish should succeed");

    let received = recorder.wait_for(1).await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].raw_data().map(|raw| &raw[..]), Some(frame));

    harness.client.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_handler_does_not_stop_later_messages() {
    init_logging();
    let harness = make_harness("handler-panic", test_config()).await;
    let calls = Arc::new(AtomicUsize::new(0));
    let recorder = Recorder::default();
    let inner = recorder.handler();
    let handler_calls = calls.clone();
    let handler: Arc<dyn TopicHandler> = Arc::new(move |message: Message| {
        if handler_calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("handler bug on first message");
        }
        inner.on_message(message);
    });
    harness
        .client
        .subscribe("vehicle", handler)
        .await
        .expect("subscribe should succeed");

    for seq in 1..=3 {
        harness
            .host
            .publish_json("vehicle", &json!({"seq": seq}))
            .await
            .expect("publish should succeed");
    }

    let received = recorder.wait_for(2).await;
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].get("seq"), Some(json!(2)));
    assert_eq!(received[1].get("seq"), Some(json!(3)));

    harness.client.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn topics_are_delivered_to_their_own_handlers() {
    init_logging();
    let harness = make_harness("fan-out", test_config()).await;
    let vehicle = Recorder::default();
    let camera = Recorder::default();
    harness
        .client
        .subscribe("vehicle", vehicle.handler())
        .await
        .expect("subscribe should succeed");
    harness
        .client
        .subscribe("camera", camera.handler())
        .await
        .expect("subscribe should succeed");

    harness
        .host
        .publish("camera", "frame")
        .await
        .expect("publish should succeed");
    harness
        .host
        .publish("vehicle", r#"{"speed":1}"#)
        .await
        .expect("publish should succeed");

    assert_eq!(vehicle.wait_for(1).await.len(), 1);
    assert_eq!(camera.wait_for(1).await.len(), 1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(vehicle.messages().len(), 1);
    assert!(camera.messages()[0].is_raw());
    assert_eq!(
        harness.client.subscribed_topics().await,
        vec!["camera", "vehicle"]
    );

    harness.client.close().await;
}
