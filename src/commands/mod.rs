/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes these top-level command modules:

- `chat`     — Interactive chat mode
- `sessions` — List and delete saved sessions
- `media`    — One-shot image generation, speech output, and transcription

These handlers are intentionally small and use the library components:
the Gemini client, the session store, and the audio pipeline.
*/

use crate::audio::{AudioCapture, Speaker};
use crate::chat_mode::{ChatMode, ModeSwitch, SwitchOutcome};
use crate::commands::special::{parse_special_command, print_help, SpecialCommand, TtsCommand};
use crate::config::Config;
use crate::error::{KaviraError, Result};
use crate::gemini::GeminiClient;
use crate::session::{SessionStore, TtsConfig};

// Special commands parser for the interactive loop
pub mod special;

// Saved session listing and deletion
pub mod sessions;

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Instantiates the Gemini client, the session store, and the speaker,
    //! and runs a readline-based interactive loop. Regular input is sent to
    //! the model and the response streams into a placeholder message;
    //! slash commands drive mode switches, sessions, attachments, and voice.

    use super::*;
    use crate::gemini::live;
    use crate::markdown;
    use crate::session::{
        apply_fragment, ChatSession, Message, Role, SourceRef, TtsEngine, GEMINI_VOICES,
    };
    use base64::Engine as _;
    use colored::Colorize;
    use futures::StreamExt;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::io::Write as _;
    use uuid::Uuid;

    /// A file staged for the next message
    enum Attachment {
        /// UTF-8 text, inlined into the prompt
        Text { name: String, content: String },
        /// An image, sent alongside the prompt in Vision mode
        Image { name: String, data_uri: String },
    }

    /// The in-flight conversation
    ///
    /// Mirrors a [`ChatSession`] but keeps the title unset until the first
    /// save, so the persisted title is derived exactly once.
    struct Conversation {
        id: String,
        title: Option<String>,
        messages: Vec<Message>,
        mode: ChatMode,
        is_loading: bool,
        suggestions: Vec<String>,
    }

    impl Conversation {
        fn new(mode: ChatMode) -> Self {
            Self {
                id: Uuid::new_v4().to_string(),
                title: None,
                messages: Vec::new(),
                mode,
                is_loading: false,
                suggestions: Vec::new(),
            }
        }

        fn from_session(session: ChatSession) -> Self {
            Self {
                id: session.id,
                title: Some(session.title),
                messages: session.messages,
                mode: session.mode,
                is_loading: false,
                suggestions: Vec::new(),
            }
        }

        /// Discard everything and start over in the given mode
        fn reset(&mut self, mode: ChatMode) {
            self.id = Uuid::new_v4().to_string();
            self.title = None;
            self.messages.clear();
            self.mode = mode;
            self.is_loading = false;
            self.suggestions.clear();
        }

        /// Save the conversation, deriving the title on the first save only
        fn persist(&mut self, store: &SessionStore) -> Result<()> {
            if self.messages.is_empty() {
                return Ok(());
            }
            let mut session = ChatSession::new(self.mode, self.messages.clone());
            session.id = self.id.clone();
            match &self.title {
                Some(title) => session.title = title.clone(),
                None => self.title = Some(session.title.clone()),
            }
            store.upsert(session)
        }
    }

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `mode` - Optional override for the starting chat mode
    pub async fn run_chat(config: Config, mode: Option<String>) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let initial_mode = match mode.as_deref() {
            Some(name) => ChatMode::parse_str(name)
                .map_err(KaviraError::InvalidInput)?,
            None => ChatMode::default(),
        };

        let client = GeminiClient::new(&config)?;
        let store = SessionStore::open_default()?;

        let mut tts = if store.has_tts_config() {
            store.load_tts()
        } else {
            TtsConfig::from_defaults(&config.tts)
        };

        let speaker = Speaker::new();
        let mut capture = AudioCapture::new();
        let mut guard = ModeSwitch::new();
        let mut conversation = Conversation::new(initial_mode);
        let mut attachment: Option<Attachment> = None;

        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(&conversation.mode, &tts);

        loop {
            let prompt = conversation.mode.format_colored_prompt();
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    // A bare number picks the matching suggestion
                    let input = match trimmed.parse::<usize>() {
                        Ok(n) if n >= 1 && n <= conversation.suggestions.len() => {
                            let picked = conversation.suggestions[n - 1].clone();
                            println!("{}", format!("> {}", picked).cyan());
                            picked
                        }
                        _ => trimmed.to_string(),
                    };

                    match parse_special_command(&input) {
                        Ok(SpecialCommand::SwitchMode(target)) => {
                            handle_mode_switch(
                                &mut rl,
                                &mut guard,
                                &mut conversation,
                                &store,
                                target,
                            )?;
                            continue;
                        }
                        Ok(SpecialCommand::NewSession) => {
                            conversation.persist(&store)?;
                            let mode = conversation.mode;
                            conversation.reset(mode);
                            println!("Started a new conversation\n");
                            continue;
                        }
                        Ok(SpecialCommand::ListSessions) => {
                            sessions::print_session_table(&store.load());
                            continue;
                        }
                        Ok(SpecialCommand::LoadSession(id)) => {
                            handle_load_session(&store, &mut conversation, &id)?;
                            continue;
                        }
                        Ok(SpecialCommand::DeleteSession(id)) => {
                            let all = store.load();
                            match sessions::resolve_session_id(&all, &id) {
                                Ok(full_id) => {
                                    store.delete_by_id(&full_id)?;
                                    println!(
                                        "{}\n",
                                        format!(
                                            "Deleted session {}",
                                            &full_id[..full_id.len().min(8)]
                                        )
                                        .green()
                                    );
                                }
                                Err(e) => eprintln!("{}\n", format!("Error: {}", e).red()),
                            }
                            continue;
                        }
                        Ok(SpecialCommand::Attach(path)) => {
                            match load_attachment(&path) {
                                Ok(loaded) => {
                                    let (name, kind) = match &loaded {
                                        Attachment::Text { name, .. } => (name, "text"),
                                        Attachment::Image { name, .. } => (name, "image"),
                                    };
                                    println!(
                                        "{}\n",
                                        format!("Attached {} ({}) to your next message", name, kind)
                                            .green()
                                    );
                                    attachment = Some(loaded);
                                }
                                Err(e) => eprintln!("{}\n", format!("Error: {}", e).red()),
                            }
                            continue;
                        }
                        Ok(SpecialCommand::Imagine(prompt_text)) => {
                            handle_imagine(&client, &store, &mut conversation, &prompt_text).await;
                            continue;
                        }
                        Ok(SpecialCommand::Speak(text)) => {
                            speak_text(&client, &speaker, &tts, &config, &text).await;
                            continue;
                        }
                        Ok(SpecialCommand::Listen) => {
                            match run_listen(&config, &mut capture).await {
                                Ok(Some(transcript)) => {
                                    send_message(
                                        &client,
                                        &store,
                                        &speaker,
                                        &tts,
                                        &config,
                                        &mut conversation,
                                        &transcript,
                                        attachment.take(),
                                    )
                                    .await?;
                                }
                                Ok(None) => println!("Nothing transcribed\n"),
                                Err(e) => eprintln!("{}\n", format!("Error: {}", e).red()),
                            }
                            continue;
                        }
                        Ok(SpecialCommand::Tts(cmd)) => {
                            handle_tts(cmd, &mut tts, &store, &speaker)?;
                            continue;
                        }
                        Ok(SpecialCommand::ShowStatus) => {
                            print_status_display(&conversation, &tts);
                            continue;
                        }
                        Ok(SpecialCommand::Help) => {
                            print_help();
                            continue;
                        }
                        Ok(SpecialCommand::Exit) => break,
                        Ok(SpecialCommand::None) => {
                            // Regular chat message
                        }
                        Err(e) => {
                            eprintln!("{}\n", e);
                            continue;
                        }
                    }

                    send_message(
                        &client,
                        &store,
                        &speaker,
                        &tts,
                        &config,
                        &mut conversation,
                        &input,
                        attachment.take(),
                    )
                    .await?;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        speaker.stop();
        capture.stop();
        conversation.persist(&store)?;
        println!("Goodbye!");
        Ok(())
    }

    /// Send one message and stream the response into a placeholder
    ///
    /// Appends the user message and an empty model message, then replaces
    /// the placeholder's content as fragments arrive. After the stream ends
    /// the session is saved and follow-up suggestions are fetched.
    #[allow(clippy::too_many_arguments)]
    async fn send_message(
        client: &GeminiClient,
        store: &SessionStore,
        speaker: &Speaker,
        tts: &TtsConfig,
        config: &Config,
        conversation: &mut Conversation,
        text: &str,
        attachment: Option<Attachment>,
    ) -> Result<()> {
        if conversation.is_loading {
            println!("{}\n", "Still responding, hold on".yellow());
            return Ok(());
        }

        let mut mode = conversation.mode;
        let user_message = match attachment {
            Some(Attachment::Image { data_uri, .. }) => {
                // An image forces the vision path for this message
                mode = ChatMode::Vision;
                Message::user(text).with_image(data_uri)
            }
            Some(Attachment::Text { name, content }) => Message::user(format!(
                "Attached File: `{}`\n\n---\n\n{}\n\n---\n\n{}",
                name, content, text
            )),
            None => Message::user(text),
        };

        let history = conversation.messages.clone();
        let placeholder = Message::placeholder();
        let placeholder_id = placeholder.id.clone();
        conversation.messages.push(user_message.clone());
        conversation.messages.push(placeholder);
        conversation.is_loading = true;
        conversation.suggestions.clear();

        let streamed = mode != ChatMode::Search;
        let mut stream = client.send(&history, &user_message, mode);
        let mut full_text = String::new();
        let mut sources: Vec<SourceRef> = Vec::new();

        while let Some(fragment) = stream.next().await {
            if streamed && !fragment.text.is_empty() {
                print!("{}", fragment.text);
                let _ = std::io::stdout().flush();
            }
            full_text.push_str(&fragment.text);
            for source in fragment.sources {
                if !sources.contains(&source) {
                    sources.push(source);
                }
            }
            conversation.messages =
                apply_fragment(&conversation.messages, &placeholder_id, &full_text, &sources);
        }

        conversation.is_loading = false;

        if streamed {
            println!("\n");
        } else {
            println!("\n{}\n", markdown::render(&full_text));
            if !sources.is_empty() {
                println!("{}", "Sources:".blue());
                for source in &sources {
                    println!("  - {} <{}>", source.title, source.uri);
                }
                println!();
            }
        }

        if tts.enabled && !full_text.is_empty() {
            speak_text(client, speaker, tts, config, &full_text).await;
        }

        conversation.persist(store)?;

        conversation.suggestions = client.suggest_replies(&conversation.messages).await;
        if !conversation.suggestions.is_empty() {
            println!("{}", "Suggestions:".cyan());
            for (i, suggestion) in conversation.suggestions.iter().enumerate() {
                println!("  {}. {}", i + 1, suggestion);
            }
            println!("{}\n", "Type a number to send one".dimmed());
        }

        Ok(())
    }

    /// Handle switching to a new chat mode
    ///
    /// An empty conversation switches immediately. With messages present
    /// the user confirms first, since the switch saves the current
    /// conversation and starts a fresh one.
    fn handle_mode_switch(
        rl: &mut DefaultEditor,
        guard: &mut ModeSwitch,
        conversation: &mut Conversation,
        store: &SessionStore,
        target: ChatMode,
    ) -> Result<()> {
        match guard.request(conversation.mode, target, conversation.messages.len()) {
            SwitchOutcome::Unchanged => {
                println!("Already in {} mode\n", conversation.mode);
            }
            SwitchOutcome::Switched => {
                conversation.mode = target;
                println!("Switched to {} mode ({})\n", target, target.description());
            }
            SwitchOutcome::NeedsConfirmation => {
                let prompt = format!(
                    "Switching to {} starts a new conversation. Continue? [y/N] ",
                    target
                );
                let confirmed = matches!(
                    rl.readline(&prompt),
                    Ok(answer) if {
                        let a = answer.trim().to_lowercase();
                        a == "y" || a == "yes"
                    }
                );

                if confirmed {
                    if let Some(mode) = guard.confirm() {
                        conversation.persist(store)?;
                        conversation.reset(mode);
                        println!("Switched to {} mode; new conversation\n", mode);
                    }
                } else {
                    guard.cancel();
                    println!("Mode switch cancelled\n");
                }
            }
        }
        Ok(())
    }

    /// Load a saved session and replay it to the terminal
    fn handle_load_session(
        store: &SessionStore,
        conversation: &mut Conversation,
        id: &str,
    ) -> Result<()> {
        let all = store.load();
        let full_id = match sessions::resolve_session_id(&all, id) {
            Ok(full_id) => full_id,
            Err(e) => {
                eprintln!("{}\n", format!("Error: {}", e).red());
                return Ok(());
            }
        };

        // Save whatever is in progress before replacing it
        conversation.persist(store)?;

        if let Some(session) = all.into_iter().find(|s| s.id == full_id) {
            println!("\nLoaded session: {}\n", session.title.bold());
            replay_session(&session);
            *conversation = Conversation::from_session(session);
        }
        Ok(())
    }

    /// Print a loaded session's messages
    fn replay_session(session: &ChatSession) {
        for message in &session.messages {
            match message.role {
                Role::User => println!("{} {}", "you:".green().bold(), message.text),
                Role::Model => {
                    println!("{}\n{}", "model:".blue().bold(), markdown::render(&message.text));
                    for source in &message.sources {
                        println!("  - {} <{}>", source.title, source.uri);
                    }
                }
            }
            println!();
        }
    }

    /// Generate an image and append it to the conversation
    async fn handle_imagine(
        client: &GeminiClient,
        store: &SessionStore,
        conversation: &mut Conversation,
        prompt: &str,
    ) {
        println!("{}", "Generating image...".cyan());
        match client.generate_image(prompt).await {
            Ok(b64) => {
                let filename = format!(
                    "imagine-{}.jpg",
                    chrono::Local::now().format("%Y%m%d-%H%M%S")
                );
                match base64::engine::general_purpose::STANDARD.decode(&b64) {
                    Ok(bytes) => {
                        if let Err(e) = std::fs::write(&filename, bytes) {
                            eprintln!("{}\n", format!("Failed to write {}: {}", filename, e).red());
                            return;
                        }
                        println!("{}\n", format!("Saved {}", filename).green());

                        let data_uri = format!("data:image/jpeg;base64,{}", b64);
                        conversation.messages.push(Message::user(format!("/imagine {}", prompt)));
                        conversation
                            .messages
                            .push(Message::model(format!("Generated image for: {}", prompt))
                                .with_image(data_uri));
                        if let Err(e) = conversation.persist(store) {
                            tracing::warn!("Failed to save session: {}", e);
                        }
                    }
                    Err(e) => eprintln!("{}\n", format!("Invalid image payload: {}", e).red()),
                }
            }
            Err(e) => eprintln!("{}\n", format!("Image generation failed: {}", e).red()),
        }
    }

    /// Speak text through the selected engine; failures are logged only
    pub(super) async fn speak_text(
        client: &GeminiClient,
        speaker: &Speaker,
        tts: &TtsConfig,
        config: &Config,
        text: &str,
    ) {
        let spoken = markdown::strip_for_speech(text);
        if spoken.is_empty() {
            return;
        }

        let result = match tts.engine {
            TtsEngine::Native => speaker.speak_native(&spoken),
            TtsEngine::Gemini => match client.synthesize(&spoken, &tts.voice).await {
                Ok(pcm) => speaker.play_pcm(&pcm, config.audio.playback_sample_rate),
                Err(e) => Err(e),
            },
        };

        if let Err(e) = result {
            tracing::warn!("Speech failed: {}", e);
        }
    }

    /// Record the microphone until Enter and return the live transcript
    pub(super) async fn run_listen(
        config: &Config,
        capture: &mut AudioCapture,
    ) -> Result<Option<String>> {
        let mut session = live::connect(config).await?;
        capture.start(&config.audio, session.frames.clone())?;
        println!("{}", "Listening... press Enter to stop".cyan());

        let mut stop = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
        });

        let (mut transcript, stopped) =
            collect_transcript(&mut session.transcripts, &mut stop).await;
        capture.stop();

        if !stopped {
            // The stdin reader is still blocked on read_line; let it consume
            // the Enter press so the line does not leak into the next prompt
            println!(
                "{}",
                "Transcription ended. Press Enter to continue".yellow()
            );
            let _ = stop.await;
        }

        // Pick up anything already in flight
        while let Ok(piece) = session.transcripts.try_recv() {
            transcript.push_str(&piece);
        }
        println!();

        let transcript = transcript.trim().to_string();
        Ok(if transcript.is_empty() {
            None
        } else {
            Some(transcript)
        })
    }

    /// Accumulate transcript pieces until the stop task fires or the
    /// channel closes
    ///
    /// Returns the text gathered so far and whether the stop task won.
    async fn collect_transcript(
        transcripts: &mut tokio::sync::mpsc::Receiver<String>,
        stop: &mut tokio::task::JoinHandle<()>,
    ) -> (String, bool) {
        let mut transcript = String::new();
        loop {
            tokio::select! {
                _ = &mut *stop => return (transcript, true),
                piece = transcripts.recv() => {
                    match piece {
                        Some(text) => {
                            print!("{}", text);
                            let _ = std::io::stdout().flush();
                            transcript.push_str(&text);
                        }
                        None => return (transcript, false),
                    }
                }
            }
        }
    }

    /// Apply a `/tts` subcommand and persist the result
    fn handle_tts(
        cmd: TtsCommand,
        tts: &mut TtsConfig,
        store: &SessionStore,
        speaker: &Speaker,
    ) -> Result<()> {
        match cmd {
            TtsCommand::Show => {
                println!(
                    "Speech output: {}  engine: {:?}  voice: {}",
                    if tts.enabled { "on".green() } else { "off".red() },
                    tts.engine,
                    tts.voice
                );
                println!("Voices: {}\n", GEMINI_VOICES.join(", "));
                return Ok(());
            }
            TtsCommand::Enable => {
                tts.enabled = true;
                println!("{}\n", "Spoken replies enabled".green());
            }
            TtsCommand::Disable => {
                tts.enabled = false;
                speaker.stop();
                println!("{}\n", "Spoken replies disabled".yellow());
            }
            TtsCommand::Engine(engine) => {
                tts.engine = engine;
                speaker.stop();
                println!("Speech engine set to {:?}\n", engine);
            }
            TtsCommand::Voice(name) => {
                match GEMINI_VOICES
                    .iter()
                    .find(|v| v.eq_ignore_ascii_case(&name))
                {
                    Some(canonical) => {
                        tts.voice = canonical.to_string();
                        println!("Voice set to {}\n", canonical);
                    }
                    None => {
                        eprintln!(
                            "{}\n",
                            format!("Unknown voice '{}'. Voices: {}", name, GEMINI_VOICES.join(", "))
                                .red()
                        );
                        return Ok(());
                    }
                }
            }
        }
        store.save_tts(tts)
    }

    /// Read a file and classify it as a text or image attachment
    fn load_attachment(path: &str) -> Result<Attachment> {
        let bytes = std::fs::read(path)
            .map_err(|e| KaviraError::InvalidInput(format!("Cannot read {}: {}", path, e)))?;
        let name = std::path::Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string());

        if let Ok(format) = image::guess_format(&bytes) {
            let mime = format.to_mime_type();
            let data_uri = format!(
                "data:{};base64,{}",
                mime,
                base64::engine::general_purpose::STANDARD.encode(&bytes)
            );
            return Ok(Attachment::Image { name, data_uri });
        }

        match String::from_utf8(bytes) {
            Ok(content) => Ok(Attachment::Text { name, content }),
            Err(_) => Err(KaviraError::InvalidInput(format!(
                "{} is neither an image nor UTF-8 text",
                name
            ))
            .into()),
        }
    }

    /// Display welcome banner at the start of interactive chat mode
    fn print_welcome_banner(mode: &ChatMode, tts: &TtsConfig) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║            Kavira Interactive Chat Mode - Welcome!           ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Mode:   {} ({})", mode.colored_tag(), mode.description());
        println!(
            "Speech: {} ({:?}, voice {})\n",
            if tts.enabled { "on".green() } else { "off".red() },
            tts.engine,
            tts.voice
        );
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    /// Display detailed status information about the current session
    fn print_status_display(conversation: &Conversation, tts: &TtsConfig) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Kavira Session Status                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!(
            "Chat Mode:         {} ({})",
            conversation.mode.colored_tag(),
            conversation.mode.description()
        );
        println!(
            "Speech Output:     {} ({:?}, voice {})",
            if tts.enabled { "on" } else { "off" },
            tts.engine,
            tts.voice
        );
        println!("Conversation Size: {} messages", conversation.messages.len());
        println!(
            "Session Title:     {}",
            conversation.title.as_deref().unwrap_or("(unsaved)")
        );
        println!("Prompt Format:     {}", conversation.mode.format_colored_prompt());
        println!();
    }

}

/// One-shot media commands
///
/// These mirror the chat-mode slash commands for scripting: generate an
/// image, speak text, or transcribe the microphone, then exit.
pub mod media {
    use super::*;
    use base64::Engine as _;
    use colored::Colorize;

    /// Generate an image and write it to disk
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration
    /// * `prompt` - Image prompt
    /// * `output` - Output path; defaults to a timestamped jpg in the
    ///   current directory
    pub async fn imagine(config: Config, prompt: String, output: Option<String>) -> Result<()> {
        let client = GeminiClient::new(&config)?;
        println!("{}", "Generating image...".cyan());

        let b64 = client.generate_image(&prompt).await?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| KaviraError::Api(format!("Invalid image payload: {}", e)))?;

        let path = output.unwrap_or_else(|| {
            format!("imagine-{}.jpg", chrono::Local::now().format("%Y%m%d-%H%M%S"))
        });
        std::fs::write(&path, bytes)?;
        println!("{}", format!("Saved {}", path).green());
        Ok(())
    }

    /// Speak text aloud and wait for playback to finish
    pub async fn speak(config: Config, text: String) -> Result<()> {
        let store = SessionStore::open_default()?;
        let tts = if store.has_tts_config() {
            store.load_tts()
        } else {
            TtsConfig::from_defaults(&config.tts)
        };

        match tts.engine {
            crate::session::TtsEngine::Native => {
                let command = if cfg!(target_os = "macos") { "say" } else { "espeak" };
                let status = tokio::process::Command::new(command)
                    .arg(&text)
                    .status()
                    .await
                    .map_err(|e| {
                        KaviraError::Audio(format!("Failed to spawn {}: {}", command, e))
                    })?;
                if !status.success() {
                    return Err(KaviraError::Audio(format!(
                        "{} exited with {}",
                        command, status
                    ))
                    .into());
                }
            }
            crate::session::TtsEngine::Gemini => {
                let client = GeminiClient::new(&config)?;
                let pcm = client.synthesize(&text, &tts.voice).await?;
                let rate = config.audio.playback_sample_rate;
                let speaker = Speaker::new();
                speaker.play_pcm(&pcm, rate)?;

                while speaker.is_speaking() {
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                }
                // Let the device drain its last buffer before tearing down
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                speaker.stop();
            }
        }
        Ok(())
    }

    /// Transcribe the microphone until Enter, optionally saving a WAV copy
    pub async fn listen(config: Config, output: Option<String>) -> Result<()> {
        let mut capture = AudioCapture::new();
        let transcript = chat::run_listen(&config, &mut capture).await?;

        match transcript {
            Some(text) => println!("{}", text),
            None => println!("{}", "Nothing transcribed".yellow()),
        }

        if let Some(path) = output {
            let wav = capture.take_wav_bytes()?;
            std::fs::write(&path, wav)?;
            println!("{}", format!("Saved recording to {}", path).green());
        }
        Ok(())
    }
}
