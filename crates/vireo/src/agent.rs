use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_stream::stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cancel::RunGuard;
use crate::errors::AgentError;
use crate::executor::{self, ToolRegistry};
use crate::hooks::MessageHook;
use crate::models::chunk::AgentChunk;
use crate::models::message::Message;
use crate::providers::base::{CompletionEvent, Provider, ProviderResponse};
use crate::result::{AgentRunResult, FinishReason, RunRecorder};
use crate::tool::{Tool, ToolResult, ToolSpec};

const DEFAULT_MAX_ITERATIONS: u32 = 5;
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Immutable configuration of an agent, fixed at construction.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub system_prompt: String,
    pub max_iterations: u32,
    pub temperature: f32,
    pub output_schema: Option<Value>,
}

/// Per-run options. None of these are required for loop correctness;
/// thread and user ids are attribution only.
#[derive(Default, Clone)]
pub struct RunOptions {
    pub thread_id: Option<String>,
    pub user_id: Option<String>,
    pub metadata: Map<String, Value>,
    pub cancellation: CancellationToken,
    pub timeout: Option<Duration>,
    pub max_iterations: Option<u32>,
    pub temperature: Option<f32>,
}

/// Drives bounded reason-then-act rounds against a model capability and
/// a set of tools, streaming typed chunks while it works.
pub struct Agent {
    config: AgentConfig,
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    specs: Vec<ToolSpec>,
    hook: Option<Arc<dyn MessageHook>>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Agent`]. `build` is the only place the API surfaces
/// configuration mistakes as errors; everything at run time resolves to
/// a well-formed result instead.
#[derive(Default)]
pub struct AgentBuilder {
    name: String,
    system_prompt: String,
    provider: Option<Arc<dyn Provider>>,
    tools: Vec<Arc<dyn Tool>>,
    max_iterations: Option<u32>,
    temperature: Option<f32>,
    output_schema: Option<Value>,
    hook: Option<Arc<dyn MessageHook>>,
}

impl AgentBuilder {
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn message_hook(mut self, hook: Arc<dyn MessageHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn build(self) -> Result<Agent> {
        if self.name.is_empty() {
            bail!("agent name must not be empty");
        }
        let Some(provider) = self.provider else {
            bail!("agent requires a provider");
        };
        let max_iterations = self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        if max_iterations == 0 {
            bail!("max_iterations must be at least 1");
        }

        let mut tools: ToolRegistry = ToolRegistry::new();
        let mut specs = Vec::with_capacity(self.tools.len());
        for tool in self.tools {
            let name = tool.name().to_string();
            if tools.contains_key(&name) {
                bail!("duplicate tool name: {name}");
            }
            specs.push(ToolSpec::from_tool(tool.as_ref()));
            tools.insert(name, tool);
        }

        Ok(Agent {
            config: AgentConfig {
                name: self.name,
                system_prompt: self.system_prompt,
                max_iterations,
                temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                output_schema: self.output_schema,
            },
            provider,
            tools,
            specs,
            hook: self.hook,
        })
    }
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run to completion and return the terminal result, without the
    /// incremental chunk timeline. Never returns an error for runtime
    /// conditions; inspect `finish_reason` instead.
    pub async fn run<S: Into<String>>(&self, input: S, options: RunOptions) -> AgentRunResult {
        let mut chunks = self.stream(input, options);
        let mut finish = None;
        while let Some(chunk) = chunks.next().await {
            if let AgentChunk::Finish { result } = chunk {
                finish = Some(result);
            }
        }
        match finish {
            Some(result) => result,
            // The loop always ends with a finish chunk; this is unreachable
            // unless a provider stream panics out from under us.
            None => RunRecorder::new().finish(
                FinishReason::Error,
                Some(AgentError::Internal(
                    "run ended without a finish chunk".to_string(),
                )),
                None,
            ),
        }
    }

    /// Run with the full chunk timeline. The final chunk is always
    /// `finish` carrying the same result `run` would have returned.
    pub fn stream<S: Into<String>>(
        &self,
        input: S,
        options: RunOptions,
    ) -> BoxStream<'_, AgentChunk> {
        let mut message = Message::user().with_text(input);
        message.metadata = options.metadata.clone();
        self.run_loop(vec![message], options)
    }

    /// Same loop seeded with an existing message history instead of a
    /// single user input.
    pub fn chat(&self, messages: Vec<Message>, options: RunOptions) -> BoxStream<'_, AgentChunk> {
        self.run_loop(messages, options)
    }

    fn notify(&self, options: &RunOptions, message: &Message) {
        if let Some(hook) = &self.hook {
            let hook = hook.clone();
            let thread_id = options.thread_id.clone();
            let message = message.clone();
            tokio::spawn(async move {
                hook.on_message(thread_id, message).await;
            });
        }
    }

    fn run_loop(&self, seed: Vec<Message>, options: RunOptions) -> BoxStream<'_, AgentChunk> {
        Box::pin(stream! {
            let guard = RunGuard::new(options.cancellation.clone(), options.timeout);
            let max_iterations = options
                .max_iterations
                .filter(|n| *n >= 1)
                .unwrap_or(self.config.max_iterations);
            let temperature = options.temperature.unwrap_or(self.config.temperature);

            let mut recorder = RunRecorder::new();
            info!(
                run_id = %recorder.run_id(),
                agent = %self.config.name,
                thread_id = options.thread_id.as_deref().unwrap_or(""),
                user_id = options.user_id.as_deref().unwrap_or(""),
                "starting run"
            );

            let mut messages: Vec<Message> = Vec::with_capacity(seed.len());
            for message in seed {
                self.notify(&options, &message);
                messages.push(message);
            }

            // Completed tool rounds; the next model call is round `rounds + 1`
            let mut rounds: u32 = 0;

            let (finish_reason, error) = loop {
                if let Err(e) = guard.check() {
                    break (FinishReason::Error, Some(e));
                }
                if rounds >= max_iterations {
                    info!(run_id = %recorder.run_id(), rounds, "iteration cap reached");
                    break (FinishReason::MaxIterations, None);
                }

                let events = match self
                    .provider
                    .complete_stream(&self.config.system_prompt, &messages, &self.specs, temperature)
                    .await
                {
                    Ok(events) => events,
                    Err(e) => break (FinishReason::Error, Some(e)),
                };

                // Drain the incremental interface, forwarding deltas as
                // chunks and keeping the final response for the round.
                let mut events = events;
                let mut response: Option<ProviderResponse> = None;
                let mut started: Vec<String> = Vec::new();
                let mut ended: HashSet<String> = HashSet::new();
                let mut stream_error: Option<AgentError> = None;
                while let Some(event) = events.next().await {
                    match event {
                        Ok(CompletionEvent::Content { delta }) => {
                            yield AgentChunk::Content { delta };
                        }
                        Ok(CompletionEvent::ToolCallStart { id, name }) => {
                            started.push(id.clone());
                            yield AgentChunk::ToolCallStart { id, name };
                        }
                        Ok(CompletionEvent::ToolCallArgs { id, fragment }) => {
                            yield AgentChunk::ToolCallArgs { id, fragment };
                        }
                        Ok(CompletionEvent::ToolCallEnd { id }) => {
                            ended.insert(id.clone());
                            yield AgentChunk::ToolCallEnd { id };
                        }
                        Ok(CompletionEvent::Done(r)) => response = Some(r),
                        Err(e) => {
                            stream_error = Some(e);
                            break;
                        }
                    }
                }

                let response = match response {
                    Some(response) if stream_error.is_none() => response,
                    _ => {
                        let e = stream_error.unwrap_or_else(|| {
                            AgentError::AdapterError(
                                "model stream ended without a final response".to_string(),
                            )
                        });
                        // Settle any announced calls so consumers still see
                        // a result per started id before the run errors out.
                        for id in started {
                            if !ended.contains(&id) {
                                yield AgentChunk::ToolCallEnd { id: id.clone() };
                            }
                            yield AgentChunk::ToolResult {
                                id,
                                success: false,
                                data: None,
                                error: Some(e.to_string()),
                            };
                        }
                        break (FinishReason::Error, Some(e));
                    }
                };
                recorder.record_usage(&response.usage);

                // A response carrying both content and tool calls counts as
                // "has tool calls"; the content is only the latest candidate
                // answer, not the terminal one.
                if let Some(content) = &response.content {
                    recorder.set_content(content.clone());
                }

                // Announce calls the provider's stream did not, and close
                // out announced ids left without their end, so every id
                // gets its start/args/end regardless of provider behavior.
                for call in &response.tool_calls {
                    if started.contains(&call.id) {
                        if !ended.contains(&call.id) {
                            yield AgentChunk::ToolCallEnd { id: call.id.clone() };
                        }
                        continue;
                    }
                    yield AgentChunk::ToolCallStart {
                        id: call.id.clone(),
                        name: call.name.clone(),
                    };
                    if !call.arguments.is_empty() {
                        yield AgentChunk::ToolCallArgs {
                            id: call.id.clone(),
                            fragment: call.arguments.clone(),
                        };
                    }
                    yield AgentChunk::ToolCallEnd { id: call.id.clone() };
                }

                let mut assistant = Message::assistant()
                    .with_tool_calls(response.tool_calls.clone());
                assistant.content = response.content.clone();
                self.notify(&options, &assistant);
                messages.push(assistant);

                if response.tool_calls.is_empty() {
                    break (FinishReason::Stop, None);
                }

                // Suspension point before tool dispatch. Announced calls
                // are settled with failed results rather than left dangling.
                if let Err(e) = guard.check() {
                    let mut results = Vec::with_capacity(response.tool_calls.len());
                    for call in &response.tool_calls {
                        let result = ToolResult::failure(&call.id, e.to_string());
                        yield AgentChunk::tool_result(&result);
                        results.push(result);
                    }
                    recorder.record_round(response.tool_calls, results);
                    break (FinishReason::Error, Some(e));
                }

                info!(
                    run_id = %recorder.run_id(),
                    round = rounds + 1,
                    tool_count = response.tool_calls.len(),
                    "dispatching tool round"
                );
                let results = executor::execute_round(&response.tool_calls, &self.tools).await;

                for result in &results {
                    yield AgentChunk::tool_result(result);
                    let message = Message::tool(&result.tool_call_id)
                        .with_text(result.content_for_model());
                    self.notify(&options, &message);
                    messages.push(message);
                }
                recorder.record_round(response.tool_calls, results);
                rounds += 1;
            };

            if let Some(e) = &error {
                warn!(run_id = %recorder.run_id(), error = %e, "run failed");
                yield AgentChunk::Error { message: e.to_string() };
            }

            let result = recorder.finish(finish_reason, error, self.config.output_schema.as_ref());
            info!(
                run_id = %result.run_id,
                finish_reason = ?result.finish_reason,
                tool_calls = result.tool_calls.len(),
                duration_ms = result.duration_ms,
                "run finished"
            );
            yield AgentChunk::Finish { result };
        })
    }
}
