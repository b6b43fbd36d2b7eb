//! Streaming relay
//!
//! Runs one conversational turn against the generation service and re-emits a normalized
//! `status` / `text` / `done` | `error` event stream.

use super::accumulator::TurnAccumulator;
use super::prompt::{artifact_tool, DEFAULT_SYSTEM_PROMPT};
use super::types::{ConversationTurn, RelayEvent};
use crate::infrastructure::ai::{
    handle_anthropic_stream, GenerationBackend, GenerationRequest, StreamFragment,
};
use anyhow::Result;
use futures::Stream;
use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub model: String,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub thinking_budget: Option<u32>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 16000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            thinking_budget: None,
        }
    }
}

/// Sends events downstream and refuses anything after the first terminal event.
struct RelayEmitter {
    tx: mpsc::UnboundedSender<RelayEvent>,
    terminated: bool,
}

impl RelayEmitter {
    fn new(tx: mpsc::UnboundedSender<RelayEvent>) -> Self {
        Self {
            tx,
            terminated: false,
        }
    }

    fn emit(&mut self, event: RelayEvent) {
        if self.terminated {
            debug!("Dropping {} event after terminal event", event.event_type());
            return;
        }
        if event.is_terminal() {
            self.terminated = true;
        }
        // A closed receiver means the consumer went away; the turn still runs to completion.
        let _ = self.tx.send(event);
    }
}

#[derive(Clone)]
pub struct StreamRelay {
    backend: Arc<dyn GenerationBackend>,
    settings: RelaySettings,
}

impl StreamRelay {
    pub fn new(backend: Arc<dyn GenerationBackend>, settings: RelaySettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Run the turn in a background task and expose its events as a stream.
    ///
    /// The stream yields exactly one terminal event and then ends.
    pub fn stream(&self, turn: ConversationTurn) -> impl Stream<Item = RelayEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let relay = self.clone();
        tokio::spawn(async move {
            relay.run(turn, tx).await;
        });
        UnboundedReceiverStream::new(rx)
    }

    /// Run the turn to completion, sending every event to `tx`.
    ///
    /// Exactly one terminal event (`done` or `error`) is sent, always last.
    pub async fn run(&self, turn: ConversationTurn, tx: mpsc::UnboundedSender<RelayEvent>) {
        let mut emitter = RelayEmitter::new(tx);
        let terminal = match self.relay_turn(&turn, &mut emitter).await {
            Ok(event) => event,
            Err(e) => {
                error!("Relay turn failed: {:#}", e);
                RelayEvent::error(e.to_string())
            }
        };
        emitter.emit(terminal);
    }

    fn build_request(&self, turn: &ConversationTurn) -> Result<GenerationRequest> {
        Ok(GenerationRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            system: self.settings.system_prompt.clone(),
            messages: turn.to_messages()?,
            tools: vec![artifact_tool()],
            thinking_budget: self.settings.thinking_budget,
        })
    }

    async fn relay_turn(
        &self,
        turn: &ConversationTurn,
        emitter: &mut RelayEmitter,
    ) -> Result<RelayEvent> {
        let request = self.build_request(turn)?;
        let byte_stream = self.backend.open_stream(&request).await?;

        let (tx_fragment, mut rx_fragment) = mpsc::unbounded_channel::<Result<StreamFragment>>();
        let mut accumulator = TurnAccumulator::new();

        // Decoder and dispatcher share one task; fragments are handled strictly in order.
        let decode = handle_anthropic_stream(byte_stream, tx_fragment);
        let dispatch = async {
            while let Some(item) = rx_fragment.recv().await {
                if let Some(event) = accumulator.apply(item?) {
                    emitter.emit(event);
                }
            }
            Ok::<(), anyhow::Error>(())
        };
        let ((), dispatched) = tokio::join!(decode, dispatch);
        dispatched?;

        let outcome = accumulator.finish();
        info!(
            "Relay turn complete: message_len={}, artifact={}",
            outcome.message.len(),
            outcome
                .artifact
                .as_ref()
                .map(|a| a.path.as_str())
                .unwrap_or("none")
        );
        Ok(outcome.into())
    }
}
