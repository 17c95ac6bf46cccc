//! Room actor: an isolated Tokio task that owns one quiz instance.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. This is the "actor model" — no shared
//! mutable state, just message passing. Because every mutation flows
//! through one channel and timer expiry is a branch of the same
//! `select!` loop, player actions and phase deadlines are serialized by
//! construction: the all-answered/timer race can never double-close a
//! round.
//!
//! ```text
//!            commands (Join, SubmitAnswer, ...)
//! gateway ──────────────────────────────────────► ┌───────────┐
//!                                                 │ RoomActor │──► per-player
//!            Countdown (question / results /      └───────────┘    event queues
//!            linger deadline) ────────────────────────┘
//! ```

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use quizforge_protocol::{
    ChatEntry, LeaderboardEntry, MAX_CHAT_LEN, Phase, PlayerId, PlayerProfile,
    PlayerPublic, Recipient, RoomId, RoomSettings, RoomSnapshot, RoomSummary,
    ServerEvent,
};
use quizforge_timer::Countdown;
use tokio::sync::{mpsc, oneshot};

use crate::{QuizDocument, RoomError, RoomPolicy, ScoringPolicy, scoring};

/// Channel sender for delivering outbound events to a player's connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// The final result of a completed quiz, emitted by the room actor when
/// it reaches `Finished`. The server forwards these to its `StatsStore`.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub room_id: RoomId,
    pub quiz_id: String,
    /// Final leaderboard, rank 1 first.
    pub rankings: Vec<LeaderboardEntry>,
}

/// One player's recorded answer to the current question.
///
/// Points are computed and applied to the member's cumulative score at
/// submission time; the ledger itself exists for duplicate detection
/// and round-completion counting.
#[derive(Debug, Clone, Copy)]
struct AnswerRecord {
    #[allow(dead_code)]
    answer_index: usize,
    #[allow(dead_code)]
    time_spent: f64,
}

/// A room member. Join order is the `Vec<Member>` position, which is
/// also the leaderboard tiebreak.
#[derive(Debug, Clone)]
struct Member {
    id: PlayerId,
    profile: PlayerProfile,
    /// `false` while the player is in the reconnection grace window.
    connected: bool,
    /// Cumulative score, updated the moment an answer is scored.
    score: u32,
}

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in most variants is a reply channel — the
/// caller sends a command and waits for the response on it.
pub(crate) enum RoomCommand {
    /// Add a player to the room (lobby only).
    Join {
        player_id: PlayerId,
        profile: PlayerProfile,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },

    /// Remove a player permanently.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Host-only: begin the quiz.
    Start {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Answer the active question. Replies with the question index the
    /// answer was recorded against.
    SubmitAnswer {
        player_id: PlayerId,
        answer: usize,
        time_spent: f64,
        reply: oneshot::Sender<Result<usize, RoomError>>,
    },

    /// Say something to the room.
    Chat {
        player_id: PlayerId,
        message: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Socket loss. Mid-game this marks the player disconnected without
    /// removing them; in the lobby it's equivalent to Leave. Replies
    /// with what happened so the registry can update its player index.
    Disconnect {
        player_id: PlayerId,
        reply: oneshot::Sender<DisconnectOutcome>,
    },

    /// A disconnected player came back on a new connection.
    Reconnect {
        player_id: PlayerId,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },

    /// Current listing info (phase + summary).
    Summary {
        reply: oneshot::Sender<(Phase, RoomSummary)>,
    },

    /// Shut down the room immediately.
    Shutdown,
}

/// Handle to a running room actor. Cheap to clone — it's just an
/// `mpsc::Sender` wrapper. The registry holds one per room.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's code.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Sends a join request and waits for the room snapshot.
    pub async fn join(
        &self,
        player_id: PlayerId,
        profile: PlayerProfile,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                player_id,
                profile,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    /// Sends a leave request.
    pub async fn leave(&self, player_id: PlayerId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                player_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    /// Asks the room to start the quiz on behalf of `player_id`.
    pub async fn start(&self, player_id: PlayerId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Start {
                player_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    /// Submits an answer to the active question.
    pub async fn submit_answer(
        &self,
        player_id: PlayerId,
        answer: usize,
        time_spent: f64,
    ) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::SubmitAnswer {
                player_id,
                answer,
                time_spent,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    /// Sends a chat message to the room.
    pub async fn chat(
        &self,
        player_id: PlayerId,
        message: String,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Chat {
                player_id,
                message,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    /// Reports a socket loss for `player_id` and learns whether the
    /// member was removed or merely suspended.
    pub async fn disconnect(
        &self,
        player_id: PlayerId,
    ) -> Result<DisconnectOutcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Disconnect {
                player_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    /// Re-binds a returning player to a fresh outbound channel.
    pub async fn reconnect(
        &self,
        player_id: PlayerId,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Reconnect {
                player_id,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    /// Requests the room's phase and listing summary.
    pub async fn summary(&self) -> Result<(Phase, RoomSummary), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Summary { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }
}

/// What a socket-loss report did to the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// The member was removed outright (lobby, or not on the roster).
    Removed,
    /// The member was kept and marked disconnected for the grace window.
    Suspended,
}

/// What the armed countdown means when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deadline {
    /// The live question's time limit.
    Question,
    /// The results display interval.
    Results,
    /// The post-`Finished` linger.
    Linger,
    /// The abandonment grace (no connected players mid-game).
    Abandoned,
}

/// Whether the actor loop keeps running after handling something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    quiz: QuizDocument,
    settings: RoomSettings,
    policy: RoomPolicy,
    scoring: ScoringPolicy,

    phase: Phase,
    /// `None` until the host starts the quiz; never decreases once set.
    current_question: Option<usize>,
    host: PlayerId,
    /// Members in join order.
    members: Vec<Member>,
    /// Per-player outbound channels (connected members only).
    senders: HashMap<PlayerId, PlayerSender>,
    /// Answer ledger for the current question; cleared on advance.
    answers: HashMap<PlayerId, AnswerRecord>,
    /// Bounded chat log, oldest first.
    chat_log: VecDeque<ChatEntry>,

    countdown: Countdown,
    pending: Option<Deadline>,
    /// Question time left when the room went abandoned, so a reconnect
    /// resumes the round instead of restarting its clock.
    resume_remaining: Option<Duration>,

    receiver: mpsc::Receiver<RoomCommand>,
    /// Tells the registry this room is gone.
    closed_tx: mpsc::UnboundedSender<RoomId>,
    /// Delivers the final leaderboard to the stats pipeline.
    outcome_tx: mpsc::UnboundedSender<MatchOutcome>,
}

impl RoomActor {
    /// Runs the actor loop, processing commands and deadlines until the
    /// room's lifecycle ends.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, quiz = %self.quiz.id, "room actor started");

        loop {
            let flow = tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => Flow::Stop,
                },
                _ = self.countdown.wait() => self.handle_deadline(),
            };
            if flow == Flow::Stop {
                break;
            }
        }

        tracing::info!(room_id = %self.room_id, "room actor stopped");
        let _ = self.closed_tx.send(self.room_id.clone());
    }

    fn handle_command(&mut self, cmd: RoomCommand) -> Flow {
        match cmd {
            RoomCommand::Join {
                player_id,
                profile,
                sender,
                reply,
            } => {
                let result = self.handle_join(player_id, profile, sender);
                let _ = reply.send(result);
                Flow::Continue
            }
            RoomCommand::Leave { player_id, reply } => {
                let (result, flow) = self.handle_leave(player_id);
                let _ = reply.send(result);
                flow
            }
            RoomCommand::Start { player_id, reply } => {
                let result = self.handle_start(player_id);
                let _ = reply.send(result);
                Flow::Continue
            }
            RoomCommand::SubmitAnswer {
                player_id,
                answer,
                time_spent,
                reply,
            } => {
                let result = self.handle_submit(player_id, answer, time_spent);
                let _ = reply.send(result);
                Flow::Continue
            }
            RoomCommand::Chat {
                player_id,
                message,
                reply,
            } => {
                let result = self.handle_chat(player_id, message);
                let _ = reply.send(result);
                Flow::Continue
            }
            RoomCommand::Disconnect { player_id, reply } => {
                let (outcome, flow) = self.handle_disconnect(player_id);
                let _ = reply.send(outcome);
                flow
            }
            RoomCommand::Reconnect {
                player_id,
                sender,
                reply,
            } => {
                let result = self.handle_reconnect(player_id, sender);
                let _ = reply.send(result);
                Flow::Continue
            }
            RoomCommand::Summary { reply } => {
                let _ = reply.send((self.phase, self.summary()));
                Flow::Continue
            }
            RoomCommand::Shutdown => {
                tracing::info!(room_id = %self.room_id, "room shutting down");
                Flow::Stop
            }
        }
    }

    /// The countdown fired. What that means depends on what was armed.
    fn handle_deadline(&mut self) -> Flow {
        let deadline = match self.pending.take() {
            Some(d) => d,
            None => return Flow::Continue,
        };

        match deadline {
            Deadline::Question => {
                tracing::debug!(room_id = %self.room_id, "question timer expired");
                self.finish_round();
                Flow::Continue
            }
            Deadline::Results => {
                self.advance();
                Flow::Continue
            }
            Deadline::Linger => {
                tracing::info!(room_id = %self.room_id, "finished room linger elapsed");
                Flow::Stop
            }
            Deadline::Abandoned => {
                tracing::info!(room_id = %self.room_id, "room abandoned, shutting down");
                Flow::Stop
            }
        }
    }

    // -- Membership -------------------------------------------------------

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        profile: PlayerProfile,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, RoomError> {
        if !self.phase.is_joinable() {
            return Err(RoomError::InvalidPhase(format!(
                "cannot join a room in phase {}",
                self.phase
            )));
        }
        if self.members.iter().any(|m| m.id == player_id) {
            return Err(RoomError::AlreadyInGame(player_id));
        }
        if self.members.len() >= self.settings.max_players {
            return Err(RoomError::RoomFull(self.room_id.clone()));
        }

        self.members.push(Member {
            id: player_id,
            profile,
            connected: true,
            score: 0,
        });
        self.senders.insert(player_id, sender);

        tracing::info!(
            room_id = %self.room_id,
            %player_id,
            players = self.members.len(),
            "player joined"
        );

        self.dispatch(
            Recipient::AllExcept(player_id),
            ServerEvent::PlayerJoined {
                players: self.roster(),
                player_count: self.members.len(),
            },
        );

        Ok(self.snapshot())
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> (Result<(), RoomError>, Flow) {
        let Some(idx) = self.members.iter().position(|m| m.id == player_id) else {
            return (Err(RoomError::NotInRoom(player_id)), Flow::Continue);
        };

        self.members.remove(idx);
        self.senders.remove(&player_id);
        self.answers.remove(&player_id);

        tracing::info!(
            room_id = %self.room_id,
            %player_id,
            players = self.members.len(),
            "player left"
        );

        if self.members.is_empty() {
            return (Ok(()), Flow::Stop);
        }

        if self.host == player_id {
            self.transfer_host();
        }

        self.dispatch(
            Recipient::All,
            ServerEvent::PlayerLeft {
                players: self.roster(),
                player_count: self.members.len(),
            },
        );

        self.after_roster_shrink();
        (Ok(()), Flow::Continue)
    }

    fn handle_disconnect(&mut self, player_id: PlayerId) -> (DisconnectOutcome, Flow) {
        // In the lobby there's nothing to resume; drop the player outright.
        if self.phase == Phase::Lobby {
            let (_, flow) = self.handle_leave(player_id);
            return (DisconnectOutcome::Removed, flow);
        }

        let Some(member) = self.members.iter_mut().find(|m| m.id == player_id) else {
            // Not on the roster: a stale index entry, report it removed.
            return (DisconnectOutcome::Removed, Flow::Continue);
        };
        if !member.connected {
            return (DisconnectOutcome::Suspended, Flow::Continue);
        }

        member.connected = false;
        self.senders.remove(&player_id);

        tracing::info!(room_id = %self.room_id, %player_id, "player disconnected mid-game");

        if self.host == player_id {
            self.transfer_host();
        }

        self.dispatch(
            Recipient::All,
            ServerEvent::PlayerLeft {
                players: self.roster(),
                player_count: self.members.len(),
            },
        );

        self.after_roster_shrink();
        (DisconnectOutcome::Suspended, Flow::Continue)
    }

    fn handle_reconnect(
        &mut self,
        player_id: PlayerId,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, RoomError> {
        let Some(member) = self.members.iter_mut().find(|m| m.id == player_id) else {
            return Err(RoomError::NotInRoom(player_id));
        };
        if member.connected {
            return Err(RoomError::AlreadyInGame(player_id));
        }

        member.connected = true;
        self.senders.insert(player_id, sender);

        tracing::info!(room_id = %self.room_id, %player_id, "player reconnected");

        // If the room had gone abandoned, resume the interrupted phase.
        if self.pending == Some(Deadline::Abandoned) {
            match self.phase {
                Phase::QuestionActive => {
                    let remaining = self.resume_remaining.take().unwrap_or_else(|| {
                        Duration::from_secs(self.settings.time_per_question_secs)
                    });
                    self.countdown.arm(remaining);
                    self.pending = Some(Deadline::Question);
                }
                Phase::QuestionResults => {
                    self.countdown.arm(self.policy.results_hold);
                    self.pending = Some(Deadline::Results);
                }
                Phase::Lobby | Phase::Finished => {
                    self.countdown.cancel();
                    self.pending = None;
                }
            }
        }

        self.dispatch(
            Recipient::AllExcept(player_id),
            ServerEvent::PlayerJoined {
                players: self.roster(),
                player_count: self.members.len(),
            },
        );

        // Replay the live question so the returning client can answer.
        if self.phase == Phase::QuestionActive {
            if let Some(idx) = self.current_question {
                let event = self.new_question_event(idx);
                self.dispatch(Recipient::Player(player_id), event);
            }
        }

        Ok(self.snapshot())
    }

    /// Hands the host role to the next connected member in join order
    /// (falling back to the first member if nobody is connected).
    fn transfer_host(&mut self) {
        let next = self
            .members
            .iter()
            .find(|m| m.connected)
            .or_else(|| self.members.first());

        if let Some(next) = next {
            self.host = next.id;
            let event = ServerEvent::HostChanged {
                new_host_id: next.id,
                new_host_name: next.profile.display_name.clone(),
            };
            tracing::info!(room_id = %self.room_id, new_host = %self.host, "host transferred");
            self.dispatch(Recipient::All, event);
        }
    }

    /// Shared bookkeeping after a member leaves or disconnects: close the
    /// round if the departed player was the last holdout, and start the
    /// abandonment clock if nobody is left connected mid-game.
    fn after_roster_shrink(&mut self) {
        let connected = self.connected_count();

        if self.phase == Phase::QuestionActive
            && connected > 0
            && self.connected_answered_count() >= connected
        {
            self.finish_round();
            return;
        }

        if connected == 0 && self.phase.is_active() {
            self.resume_remaining = self.countdown.remaining();
            self.countdown.arm(self.policy.abandon_grace);
            self.pending = Some(Deadline::Abandoned);
            tracing::info!(
                room_id = %self.room_id,
                "no connected players, abandonment grace started"
            );
        }
    }

    // -- Quiz progression -------------------------------------------------

    fn handle_start(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if player_id != self.host {
            return Err(RoomError::NotHost(player_id));
        }
        if self.phase != Phase::Lobby {
            return Err(RoomError::InvalidPhase(format!(
                "cannot start a quiz in phase {}",
                self.phase
            )));
        }
        if self.members.len() < RoomSettings::MIN_PLAYERS {
            return Err(RoomError::InsufficientPlayers {
                have: self.members.len(),
                need: RoomSettings::MIN_PLAYERS,
            });
        }

        tracing::info!(
            room_id = %self.room_id,
            players = self.members.len(),
            questions = self.quiz.len(),
            "quiz started"
        );
        self.present_question(0);
        Ok(())
    }

    fn present_question(&mut self, index: usize) {
        self.answers.clear();
        self.current_question = Some(index);
        self.phase = Phase::QuestionActive;

        let event = self.new_question_event(index);
        self.dispatch(Recipient::All, event);

        self.countdown
            .arm(Duration::from_secs(self.settings.time_per_question_secs));
        self.pending = Some(Deadline::Question);

        tracing::debug!(
            room_id = %self.room_id,
            question = index,
            limit_secs = self.settings.time_per_question_secs,
            "question presented"
        );
    }

    fn handle_submit(
        &mut self,
        player_id: PlayerId,
        answer: usize,
        time_spent: f64,
    ) -> Result<usize, RoomError> {
        if self.phase != Phase::QuestionActive {
            return Err(RoomError::InvalidPhase("no question is active".into()));
        }
        let index = self.current_question.expect("active phase has a question");

        let Some(idx) = self.members.iter().position(|m| m.id == player_id) else {
            return Err(RoomError::NotInRoom(player_id));
        };

        if self.answers.contains_key(&player_id) {
            return Err(RoomError::DuplicateAnswer(player_id));
        }

        let question = &self.quiz.questions[index];
        if answer >= question.options.len() {
            return Err(RoomError::InvalidAnswer(answer));
        }

        let limit = self.settings.time_per_question_secs as f64;
        let time_spent = time_spent.clamp(0.0, limit);
        let correct = answer == question.correct_option;
        let points = scoring::score(&self.scoring, correct, time_spent, limit);

        // The cumulative score is authoritative at submission; the round
        // close only reveals it.
        let member = &mut self.members[idx];
        member.score += points;
        let player_name = member.profile.display_name.clone();

        self.answers.insert(
            player_id,
            AnswerRecord {
                answer_index: answer,
                time_spent,
            },
        );

        tracing::debug!(
            room_id = %self.room_id,
            %player_id,
            question = index,
            answered = self.answers.len(),
            "answer recorded"
        );

        // Private ack first (no correctness), then the progress broadcast.
        self.dispatch(
            Recipient::Player(player_id),
            ServerEvent::AnswerReceived {
                question_index: index,
            },
        );
        self.dispatch(
            Recipient::All,
            ServerEvent::AnswerSubmitted {
                player_name,
                answered_count: self.connected_answered_count(),
                total_players: self.connected_count(),
            },
        );

        if self.connected_answered_count() >= self.connected_count() {
            self.finish_round();
        }

        Ok(index)
    }

    /// Closes the current round: reveals the answer, broadcasts the
    /// standings, and starts the results display interval. Scores were
    /// already applied as each answer came in; missing answers are
    /// simply zero points.
    ///
    /// Guarded by the phase check, so the all-answered path and the timer
    /// path can both call it and only the first has any effect.
    fn finish_round(&mut self) {
        if self.phase != Phase::QuestionActive {
            return;
        }
        let index = self.current_question.expect("active phase has a question");

        self.phase = Phase::QuestionResults;
        self.countdown.cancel();

        let leaderboard = self.leaderboard();
        self.dispatch(
            Recipient::All,
            ServerEvent::QuestionResults {
                question_index: index,
                correct_option: self.quiz.questions[index].correct_option,
                leaderboard,
            },
        );

        self.countdown.arm(self.policy.results_hold);
        self.pending = Some(Deadline::Results);

        tracing::info!(
            room_id = %self.room_id,
            question = index,
            answers = self.answers.len(),
            "round closed"
        );
    }

    /// Moves on from the results screen: next question, or the end.
    fn advance(&mut self) {
        if self.phase != Phase::QuestionResults {
            return;
        }
        let next = self.current_question.expect("results phase has a question") + 1;

        if next < self.quiz.len() {
            self.present_question(next);
        } else {
            self.finish_quiz();
        }
    }

    fn finish_quiz(&mut self) {
        self.phase = Phase::Finished;
        let leaderboard = self.leaderboard();

        self.dispatch(
            Recipient::All,
            ServerEvent::QuizFinished {
                leaderboard: leaderboard.clone(),
            },
        );

        let _ = self.outcome_tx.send(MatchOutcome {
            room_id: self.room_id.clone(),
            quiz_id: self.quiz.id.clone(),
            rankings: leaderboard,
        });

        self.countdown.arm(self.policy.finished_linger);
        self.pending = Some(Deadline::Linger);

        tracing::info!(room_id = %self.room_id, "quiz finished");
    }

    // -- Chat -------------------------------------------------------------

    fn handle_chat(
        &mut self,
        player_id: PlayerId,
        message: String,
    ) -> Result<(), RoomError> {
        let Some(member) = self.members.iter().find(|m| m.id == player_id) else {
            return Err(RoomError::NotInRoom(player_id));
        };

        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(RoomError::InvalidMessage("empty message".into()));
        }
        if trimmed.chars().count() > MAX_CHAT_LEN {
            return Err(RoomError::InvalidMessage(format!(
                "message exceeds {MAX_CHAT_LEN} characters"
            )));
        }

        let entry = ChatEntry {
            player_id,
            player_name: member.profile.display_name.clone(),
            message: trimmed.to_string(),
            timestamp: now_ms(),
        };

        if self.chat_log.len() == CHAT_LOG_CAP {
            self.chat_log.pop_front();
        }
        self.chat_log.push_back(entry.clone());

        self.dispatch(Recipient::All, ServerEvent::chat(&entry));
        Ok(())
    }

    // -- Views and plumbing -----------------------------------------------

    fn new_question_event(&self, index: usize) -> ServerEvent {
        ServerEvent::NewQuestion {
            question_index: index,
            question_number: index + 1,
            total_questions: self.quiz.len(),
            time_limit: self.settings.time_per_question_secs,
            question: self.quiz.questions[index].view(),
        }
    }

    fn roster(&self) -> Vec<PlayerPublic> {
        self.members
            .iter()
            .map(|m| PlayerPublic {
                id: m.id,
                display_name: m.profile.display_name.clone(),
                avatar: m.profile.avatar.clone(),
                level: m.profile.level,
                connected: m.connected,
                score: m.score,
            })
            .collect()
    }

    fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let players: Vec<_> = self
            .members
            .iter()
            .map(|m| (m.id, &m.profile, m.score))
            .collect();
        scoring::build_leaderboard(&players)
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id.clone(),
            quiz_id: self.quiz.id.clone(),
            quiz_title: self.quiz.title.clone(),
            total_questions: self.quiz.len(),
            host_id: self.host,
            settings: self.settings,
            phase: self.phase,
            current_question: self.current_question,
            players: self.roster(),
        }
    }

    fn summary(&self) -> RoomSummary {
        let host_name = self
            .members
            .iter()
            .find(|m| m.id == self.host)
            .map(|m| m.profile.display_name.clone())
            .unwrap_or_default();
        RoomSummary {
            room_id: self.room_id.clone(),
            quiz_title: self.quiz.title.clone(),
            host_name,
            player_count: self.members.len(),
            max_players: self.settings.max_players,
        }
    }

    fn connected_count(&self) -> usize {
        self.members.iter().filter(|m| m.connected).count()
    }

    /// Answers on the ledger that belong to currently-connected members.
    /// A player who answered and then dropped does not count toward the
    /// all-answered trigger.
    fn connected_answered_count(&self) -> usize {
        self.members
            .iter()
            .filter(|m| m.connected && self.answers.contains_key(&m.id))
            .count()
    }

    /// Delivers an event to the addressed recipients. Silently drops
    /// players whose outbound queue is gone (socket already closed).
    fn dispatch(&self, recipient: Recipient, event: ServerEvent) {
        match recipient {
            Recipient::All => {
                for sender in self.senders.values() {
                    let _ = sender.send(event.clone());
                }
            }
            Recipient::Player(pid) => {
                if let Some(sender) = self.senders.get(&pid) {
                    let _ = sender.send(event);
                }
            }
            Recipient::AllExcept(excluded) => {
                for (pid, sender) in &self.senders {
                    if *pid != excluded {
                        let _ = sender.send(event.clone());
                    }
                }
            }
        }
    }
}

/// Milliseconds since the Unix epoch, for chat timestamps.
fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Maximum chat entries retained per room.
const CHAT_LOG_CAP: usize = 100;

/// Spawns a new room actor task and returns a handle to it.
///
/// The host is recorded but not yet a member; the registry joins them
/// through the handle immediately after spawning.
#[allow(clippy::too_many_arguments)]
pub(crate) fn spawn_room(
    room_id: RoomId,
    host: PlayerId,
    quiz: QuizDocument,
    settings: RoomSettings,
    policy: RoomPolicy,
    scoring: ScoringPolicy,
    closed_tx: mpsc::UnboundedSender<RoomId>,
    outcome_tx: mpsc::UnboundedSender<MatchOutcome>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(policy.channel_size);

    let actor = RoomActor {
        room_id: room_id.clone(),
        quiz,
        settings,
        policy,
        scoring,
        phase: Phase::Lobby,
        current_question: None,
        host,
        members: Vec::new(),
        senders: HashMap::new(),
        answers: HashMap::new(),
        chat_log: VecDeque::with_capacity(CHAT_LOG_CAP),
        countdown: Countdown::new(),
        pending: None,
        resume_remaining: None,
        receiver: rx,
        closed_tx,
        outcome_tx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
