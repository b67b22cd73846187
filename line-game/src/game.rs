//! The interactive loop: read a line, resolve it, take a turn, print.

use line_core::persistence::SaveStore;
use line_core::{Action, Engine, GameState, Perspective, Session, TurnOutcome};
use line_intent::{IntentResolver, Resolution};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::{debug, info, warn};

use crate::render::TextBank;

/// Slot used by `save` and `load` without an argument.
pub const DEFAULT_SLOT: &str = "autosave";

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Finished,
}

/// One running game: a session plus everything needed to play it.
pub struct Game<R> {
    engine: Engine,
    resolver: R,
    text: TextBank,
    store: Option<SaveStore>,
    session: Session,
}

impl<R: IntentResolver> Game<R> {
    pub fn new(engine: Engine, resolver: R, text: TextBank, store: Option<SaveStore>, session: Session) -> Self {
        Self {
            engine,
            resolver,
            text,
            store,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Intro text (unless skipped) and a first look around.
    pub fn opening(&self, skip_intro: bool) -> Vec<String> {
        let mut out = Vec::new();
        if !skip_intro {
            out.push(self.text.ui("ui.title", &[]));
            out.push(self.text.ui(&format!("intro.{}", self.session.character.perspective), &[]));
        }
        out.extend(self.describe_here());
        out
    }

    fn describe_here(&self) -> Vec<String> {
        // Look is free, so a scratch copy keeps `opening` read-only.
        let mut scratch = self.session.clone();
        let outcome = self.engine.take_turn(&mut scratch, Action::Look);
        self.render(&outcome)
    }

    fn render(&self, outcome: &TurnOutcome) -> Vec<String> {
        let mut out: Vec<String> = outcome.narrative.iter().map(|l| self.text.render(l)).collect();
        if outcome.pending_choice.is_some() && !outcome.is_rejected() {
            out.push(self.text.ui("ui.choices", &[]));
        }
        out
    }

    /// Handle one line of player input.
    pub async fn handle(&mut self, input: &str) -> (Vec<String>, Step) {
        let input = input.trim();
        if input.is_empty() {
            return (Vec::new(), Step::Continue);
        }
        if let Some(out) = self.meta_command(input) {
            return (out, Step::Continue);
        }

        let valid = self.engine.valid_actions(&self.session);
        let action = match self.resolver.resolve(input, &valid).await {
            Resolution::Matched(action) => action,
            Resolution::NoMatch => {
                debug!(input, "Unresolved input");
                let mut out = vec![self.text.ui("ui.no_match", &[])];
                if input.starts_with("save") || input.starts_with("load") {
                    out.push(self.text.ui("ui.meta_help", &[]));
                }
                return (out, Step::Continue);
            }
        };

        let outcome = self.engine.take_turn(&mut self.session, action);
        let mut out = self.render(&outcome);
        if outcome.action == Action::Help {
            out.push(self.text.ui("ui.meta_help", &[]));
        }
        if outcome.state.is_terminal() {
            out.push(self.text.ui("ui.goodbye", &[]));
            return (out, Step::Finished);
        }
        (out, Step::Continue)
    }

    /// `save [slot]`, `load [slot]` and `slots`. `None` if `input` is none of them.
    fn meta_command(&mut self, input: &str) -> Option<Vec<String>> {
        let mut words = input.split_whitespace();
        let verb = words.next()?.to_ascii_lowercase();
        let slot = words.next().unwrap_or(DEFAULT_SLOT).to_string();
        if words.next().is_some() {
            return None;
        }
        let out = match verb.as_str() {
            "save" => self.save(&slot),
            "load" => self.load(&slot),
            "slots" if slot == DEFAULT_SLOT => self.slots(),
            _ => return None,
        };
        Some(out)
    }

    fn save(&self, slot: &str) -> Vec<String> {
        let Some(store) = &self.store else {
            return vec![self.text.ui("ui.no_store", &[("error", "no save database")])];
        };
        match store.save_snapshot(slot, &self.session.snapshot()) {
            Ok(()) => vec![self.text.ui("ui.saved", &[("slot", slot)])],
            Err(e) => {
                warn!(slot, error = %e, "Save failed");
                vec![self.text.ui("ui.save_failed", &[("error", &e.to_string())])]
            }
        }
    }

    fn load(&mut self, slot: &str) -> Vec<String> {
        let Some(store) = &self.store else {
            return vec![self.text.ui("ui.no_store", &[("error", "no save database")])];
        };
        let restored = match store.load_snapshot(slot) {
            Ok(Some(snapshot)) => self.engine.restore(snapshot),
            Ok(None) => return vec![self.text.ui("ui.no_save", &[("slot", slot)])],
            Err(e) => Err(e),
        };
        match restored {
            Ok(session) => {
                self.session = session;
                let turn = self.session.turn.to_string();
                let mut out = vec![self.text.ui("ui.loaded", &[("slot", slot), ("turn", &turn)])];
                out.extend(self.describe_here());
                out
            }
            Err(e) => {
                warn!(slot, error = %e, "Load failed");
                vec![self.text.ui("ui.save_failed", &[("error", &e.to_string())])]
            }
        }
    }

    fn slots(&self) -> Vec<String> {
        let Some(store) = &self.store else {
            return vec![self.text.ui("ui.no_store", &[("error", "no save database")])];
        };
        match store.list_slots() {
            Ok(slots) if slots.is_empty() => vec![self.text.ui("ui.no_slots", &[])],
            Ok(slots) => {
                let names: Vec<String> = slots.into_iter().map(|s| s.slot).collect();
                vec![self.text.ui("ui.slots", &[("slots", &names.join(", "))])]
            }
            Err(e) => vec![self.text.ui("ui.save_failed", &[("error", &e.to_string())])],
        }
    }

    /// Play until a terminal state, `quit`, or end of input.
    ///
    /// # Errors
    /// On I/O failure reading input or writing output.
    pub async fn run<B, W>(&mut self, lines: &mut Lines<B>, out: &mut W, skip_intro: bool) -> anyhow::Result<()>
    where
        B: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        write_lines(out, &self.opening(skip_intro)).await?;
        if self.session.state.is_terminal() {
            return Ok(());
        }
        loop {
            out.write_all(self.text.ui("ui.prompt", &[]).as_bytes()).await?;
            out.write_all(b" ").await?;
            out.flush().await?;
            let valid = self.engine.valid_actions(&self.session);
            let read = lines.next_line();
            tokio::pin!(read);
            let next = tokio::select! {
                line = &mut read => line?,
                () = self.resolver.prepare(&valid) => read.await?,
            };
            let Some(line) = next else {
                info!(session = %self.session.id, turn = self.session.turn, "Input closed");
                break;
            };
            let (text, step) = self.handle(&line).await;
            write_lines(out, &text).await?;
            if step == Step::Finished {
                break;
            }
        }
        if self.session.state == GameState::TerminalAbandoned {
            debug!(session = %self.session.id, "Player quit");
        }
        Ok(())
    }
}

/// Ask which perspective to play until the answer parses. `None` on end of input.
///
/// # Errors
/// On I/O failure.
pub async fn prompt_perspective<B, W>(lines: &mut Lines<B>, out: &mut W, text: &TextBank) -> anyhow::Result<Option<Perspective>>
where
    B: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        write_lines(out, &[text.ui("ui.title", &[]), text.ui("ui.choose_perspective", &[])]).await?;
        out.write_all(b"> ").await?;
        out.flush().await?;
        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        if let Ok(p) = line.parse() {
            return Ok(Some(p));
        }
    }
}

async fn write_lines<W: AsyncWrite + Unpin>(out: &mut W, lines: &[String]) -> std::io::Result<()> {
    for line in lines {
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
    }
    out.flush().await
}

#[cfg(test)]
mod tests {
    use line_core::GameConfig;
    use line_core::config::PersistenceConfig;
    use line_intent::FixedCommandResolver;
    use tokio::io::BufReader;

    use super::*;

    fn game(perspective: Perspective) -> Game<FixedCommandResolver> {
        let engine = Engine::builtin(GameConfig::default()).expect("engine");
        let session = engine.new_session(perspective, 7);
        let store = SaveStore::open_in_memory(&PersistenceConfig::default()).expect("store");
        Game::new(engine, FixedCommandResolver, TextBank::builtin().expect("text"), Some(store), session)
    }

    #[tokio::test]
    async fn look_renders_prose_not_keys() {
        let mut g = game(Perspective::Migrant);
        let (out, step) = g.handle("look around").await;
        assert_eq!(step, Step::Continue);
        assert!(!out.is_empty());
        assert!(out.iter().all(|l| !l.starts_with("location.") && !l.starts_with("look.")));
        assert_eq!(g.session().turn, 0);
    }

    #[tokio::test]
    async fn gibberish_gets_a_hint() {
        let mut g = game(Perspective::Patrol);
        let (out, _) = g.handle("dance wildly").await;
        assert_eq!(out, vec![TextBank::builtin().expect("text").ui("ui.no_match", &[])]);
    }

    #[tokio::test]
    async fn save_then_load_rewinds() {
        let mut g = game(Perspective::Migrant);
        let (out, _) = g.handle("save start").await;
        assert!(out[0].contains("start"));
        g.handle("rest").await;
        assert_eq!(g.session().turn, 1);
        g.handle("load start").await;
        assert_eq!(g.session().turn, 0);
        let (out, _) = g.handle("slots").await;
        assert!(out[0].contains("start"));
        let (out, _) = g.handle("load nowhere").await;
        assert!(out[0].contains("nowhere"));
    }

    #[tokio::test]
    async fn quit_finishes() {
        let mut g = game(Perspective::Migrant);
        let (_, step) = g.handle("quit").await;
        assert_eq!(step, Step::Finished);
        assert_eq!(g.session().state, GameState::TerminalAbandoned);
    }

    #[tokio::test]
    async fn run_reads_until_quit() {
        let mut g = game(Perspective::Patrol);
        let mut lines = BufReader::new(&b"status\nquit\nlook\n"[..]).lines();
        let mut out = Vec::new();
        g.run(&mut lines, &mut out, true).await.expect("run");
        assert_eq!(g.session().state, GameState::TerminalAbandoned);
        let printed = String::from_utf8(out).expect("utf8");
        assert!(printed.contains("Turn 0/"));
        // Nothing after quit is read.
        assert!(lines.next_line().await.expect("read").is_some());
    }

    #[tokio::test]
    async fn perspective_prompt_retries() {
        let text = TextBank::builtin().expect("text");
        let mut lines = BufReader::new(&b"tourist\n2\n"[..]).lines();
        let mut out = Vec::new();
        let p = prompt_perspective(&mut lines, &mut out, &text).await.expect("prompt");
        assert_eq!(p, Some(Perspective::Patrol));
    }
}
