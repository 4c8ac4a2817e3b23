mod common;

use common::{next_local_description, wait};
use rtc_negotiator::{ChannelSink, ClientConfig, EngineFactory, SdpType};

fn offline_config() -> ClientConfig {
    ClientConfig {
        ice_servers: Vec::new(),
        ..Default::default()
    }
}

#[tokio::test]
async fn webrtc_engine_produces_offer_and_answer_offline() {
    let factory = EngineFactory::new(offline_config()).unwrap();

    let (alice_sink, mut alice_rx) = ChannelSink::new("alice");
    let alice = factory.create_session(alice_sink).await.unwrap();
    let (bob_sink, mut bob_rx) = ChannelSink::new("bob");
    let bob = factory.create_session(bob_sink).await.unwrap();

    alice.create_offer().await.unwrap();
    let offer = wait(next_local_description(&mut alice_rx)).await;
    assert_eq!(offer.sdp_type, SdpType::Offer);
    assert!(offer.sdp.contains("m=video"));
    assert!(offer.sdp.contains("m=audio"));

    bob.set_remote_description(offer).await.unwrap();
    bob.create_answer().await.unwrap();
    let answer = wait(next_local_description(&mut bob_rx)).await;
    assert_eq!(answer.sdp_type, SdpType::Answer);

    alice.set_remote_description(answer).await.unwrap();

    alice.shutdown().await;
    bob.shutdown().await;
}
