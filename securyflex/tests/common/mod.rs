#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use securyflex::{
    AuthService, AuthServiceBuilder, EventHandler, InMemoryIdentityProvider, InMemoryProfileStore,
    ManualClock,
};
use securyflex_core::{error::EventError, events::Event};

pub const PASSWORD: &str = "Veilig-Wachtwoord-42";

pub type TestService = AuthService<InMemoryIdentityProvider, InMemoryProfileStore>;

/// Collects every emitted event.
#[derive(Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<Event>>,
}

impl RecordingHandler {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct Harness {
    pub auth: TestService,
    pub identity: Arc<InMemoryIdentityProvider>,
    pub profiles: Arc<InMemoryProfileStore>,
    pub clock: ManualClock,
    pub events: Arc<RecordingHandler>,
}

pub async fn harness() -> Harness {
    harness_with(AuthServiceBuilder::new()).await
}

pub async fn harness_with(builder: AuthServiceBuilder<securyflex::NoProviders>) -> Harness {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let profiles = Arc::new(InMemoryProfileStore::new());
    let clock = ManualClock::default();
    let events = Arc::new(RecordingHandler::default());

    let auth = builder
        .with_clock(Arc::new(clock.clone()))
        .with_event_handler(events.clone())
        .with_providers(identity.clone(), profiles.clone())
        .build()
        .await
        .expect("Failed to build auth service");

    Harness {
        auth,
        identity,
        profiles,
        clock,
        events,
    }
}
