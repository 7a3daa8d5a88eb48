//! The conversational flows as explicit state machines.
//!
//! [`OutreachFlow`] drives the cold-outreach conversation and [`ReplyFlow`]
//! the inbound-answer one. Each user input advances a flow by exactly one
//! typed transition; the returned [`Step`] carries the next prompt plus an
//! optional effect for the driver to perform (draft generation, sending).
//! Invalid inputs re-prompt without changing state, and draft corrections
//! loop until the user approves.
//!
//! The machines themselves perform no I/O. Drafting and sending are the
//! driver's business: it executes the requested action and feeds the result
//! back through [`OutreachFlow::draft_ready`] / [`ReplyFlow::reply_ready`].

use leadscout_llm::Draft;

use crate::compose::{SenderProfile, is_valid_email};

/// An effect the outreach driver must perform before the flow can continue.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Generate a draft for this theme, then call
    /// [`OutreachFlow::draft_ready`] with the result.
    GenerateDraft { theme: String },
    /// Extract recipients from the exported table at this path and send the
    /// approved draft to each.
    SendBatch { table: String },
}

/// One advance of a flow: the next prompt for the user, plus an optional
/// effect for the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<A = Action> {
    pub prompt: String,
    pub action: Option<A>,
}

impl<A> Step<A> {
    fn prompt(text: impl Into<String>) -> Self {
        Self {
            prompt: text.into(),
            action: None,
        }
    }
}

enum State {
    AwaitingSenderEmail,
    AwaitingPhone {
        email: String,
    },
    AwaitingCredential {
        email: String,
        phone: String,
    },
    AwaitingTheme {
        sender: SenderProfile,
    },
    /// `draft` is `None` while the driver is still generating.
    AwaitingDraftReview {
        sender: SenderProfile,
        theme: String,
        draft: Option<Draft>,
    },
    AwaitingRecipientSource {
        sender: SenderProfile,
        draft: Draft,
    },
    Sending {
        sender: SenderProfile,
        draft: Draft,
    },
}

/// The multi-step outreach flow.
pub struct OutreachFlow {
    state: State,
}

impl Default for OutreachFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl OutreachFlow {
    pub fn new() -> Self {
        Self {
            state: State::AwaitingSenderEmail,
        }
    }

    /// The opening prompt.
    pub fn start(&self) -> Step {
        Step::prompt("Please enter your email address:")
    }

    /// Whether the flow has reached the sending stage.
    pub fn is_sending(&self) -> bool {
        matches!(self.state, State::Sending { .. })
    }

    /// Whether the flow is waiting for the exported-table path.
    pub fn awaiting_recipients(&self) -> bool {
        matches!(self.state, State::AwaitingRecipientSource { .. })
    }

    /// The collected sender profile, once the credential step is past.
    pub fn sender(&self) -> Option<&SenderProfile> {
        match &self.state {
            State::AwaitingTheme { sender }
            | State::AwaitingDraftReview { sender, .. }
            | State::AwaitingRecipientSource { sender, .. }
            | State::Sending { sender, .. } => Some(sender),
            _ => None,
        }
    }

    /// The approved (or pending) draft, where one exists.
    pub fn draft(&self) -> Option<&Draft> {
        match &self.state {
            State::AwaitingDraftReview { draft, .. } => draft.as_ref(),
            State::AwaitingRecipientSource { draft, .. } | State::Sending { draft, .. } => {
                Some(draft)
            }
            _ => None,
        }
    }

    /// Advance the flow with one user input.
    pub fn advance(&mut self, input: &str) -> Step {
        let input = input.trim();
        let state = std::mem::replace(&mut self.state, State::AwaitingSenderEmail);

        let (next, step) = match state {
            State::AwaitingSenderEmail => {
                if is_valid_email(input) {
                    (
                        State::AwaitingPhone {
                            email: input.to_string(),
                        },
                        Step::prompt("Sender email set. Please enter your phone number:"),
                    )
                } else {
                    (
                        State::AwaitingSenderEmail,
                        Step::prompt("Please enter a valid email address."),
                    )
                }
            }

            State::AwaitingPhone { email } => {
                if input.is_empty() {
                    (
                        State::AwaitingPhone { email },
                        Step::prompt("Please enter your phone number:"),
                    )
                } else {
                    (
                        State::AwaitingCredential {
                            email,
                            phone: input.to_string(),
                        },
                        Step::prompt(
                            "Phone number set. Please enter your mail transport credential:",
                        ),
                    )
                }
            }

            State::AwaitingCredential { email, phone } => {
                if input.is_empty() {
                    (
                        State::AwaitingCredential { email, phone },
                        Step::prompt("Please enter your mail transport credential:"),
                    )
                } else {
                    (
                        State::AwaitingTheme {
                            sender: SenderProfile {
                                email,
                                phone,
                                credential: input.to_string(),
                            },
                        },
                        Step::prompt("Credential set. What is the theme for your email?"),
                    )
                }
            }

            State::AwaitingTheme { sender } => {
                if input.is_empty() {
                    (
                        State::AwaitingTheme { sender },
                        Step::prompt("What is the theme for your email?"),
                    )
                } else {
                    let theme = input.to_string();
                    (
                        State::AwaitingDraftReview {
                            sender,
                            theme: theme.clone(),
                            draft: None,
                        },
                        Step {
                            prompt: "Drafting your email...".into(),
                            action: Some(Action::GenerateDraft { theme }),
                        },
                    )
                }
            }

            State::AwaitingDraftReview {
                sender,
                theme,
                draft: None,
            } => (
                State::AwaitingDraftReview {
                    sender,
                    theme,
                    draft: None,
                },
                Step::prompt("The draft is still being generated, one moment."),
            ),

            State::AwaitingDraftReview {
                sender,
                theme,
                draft: Some(draft),
            } => {
                if input.eq_ignore_ascii_case("yes") {
                    (
                        State::AwaitingRecipientSource { sender, draft },
                        Step::prompt(
                            "Draft approved. Please enter the path to the exported companies table:",
                        ),
                    )
                } else {
                    // Anything but approval is a correction; regenerate.
                    let theme = format!("{theme}\nCorrections: {input}");
                    (
                        State::AwaitingDraftReview {
                            sender,
                            theme: theme.clone(),
                            draft: None,
                        },
                        Step {
                            prompt: "Applying your corrections...".into(),
                            action: Some(Action::GenerateDraft { theme }),
                        },
                    )
                }
            }

            State::AwaitingRecipientSource { sender, draft } => {
                if input.is_empty() {
                    (
                        State::AwaitingRecipientSource { sender, draft },
                        Step::prompt("Please enter the path to the exported companies table:"),
                    )
                } else {
                    let table = input.to_string();
                    (
                        State::Sending { sender, draft },
                        Step {
                            prompt: "Sending personalized emails...".into(),
                            action: Some(Action::SendBatch { table }),
                        },
                    )
                }
            }

            state @ State::Sending { .. } => {
                (state, Step::prompt("The send is already underway."))
            }
        };

        self.state = next;
        step
    }

    /// Feed a generated draft back into the flow. Returns the review prompt,
    /// or a re-prompt if the flow is not waiting for a draft.
    pub fn draft_ready(&mut self, draft: Draft) -> Step {
        match &mut self.state {
            State::AwaitingDraftReview {
                draft: pending @ None,
                ..
            } => {
                let prompt = format!(
                    "Subject: {}\n\nHere is a draft based on your input:\n{}\n\n\
                     Do you approve this draft? Type 'yes' to approve, or provide your corrections.",
                    draft.subject, draft.html
                );
                *pending = Some(draft);
                Step::prompt(prompt)
            }
            _ => Step::prompt("No draft was requested at this point."),
        }
    }

    /// Report that draft generation failed. The flow returns to the theme
    /// step so the user can try again.
    pub fn draft_failed(&mut self) -> Step {
        let state = std::mem::replace(&mut self.state, State::AwaitingSenderEmail);
        self.state = match state {
            State::AwaitingDraftReview { sender, .. } => State::AwaitingTheme { sender },
            other => other,
        };
        Step::prompt("Failed to generate a draft, please try entering the theme again.")
    }
}

// ---------------------------------------------------------------------------
// ReplyFlow
// ---------------------------------------------------------------------------

/// An effect the reply driver must perform before the flow can continue.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyAction {
    /// Generate a reply to this inquiry, then call
    /// [`ReplyFlow::reply_ready`] with the result.
    GenerateReply { inquiry: String },
    /// Send the approved reply to this address.
    SendReply { to: String },
}

enum ReplyState {
    AwaitingInquiry,
    /// `reply` is `None` while the driver is still generating.
    AwaitingReplyReview {
        inquiry: String,
        reply: Option<String>,
    },
    AwaitingRecipient {
        reply: String,
    },
    Sending {
        reply: String,
    },
}

/// The inbound-answer flow: paste an inquiry, review the generated reply,
/// name the recipient, send.
pub struct ReplyFlow {
    state: ReplyState,
}

impl Default for ReplyFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyFlow {
    pub fn new() -> Self {
        Self {
            state: ReplyState::AwaitingInquiry,
        }
    }

    /// The opening prompt.
    pub fn start(&self) -> Step<ReplyAction> {
        Step::prompt("Paste the inquiry you want to answer:")
    }

    /// Whether the flow has reached the sending stage.
    pub fn is_sending(&self) -> bool {
        matches!(self.state, ReplyState::Sending { .. })
    }

    /// Whether the flow is waiting for the recipient's address.
    pub fn awaiting_recipient(&self) -> bool {
        matches!(self.state, ReplyState::AwaitingRecipient { .. })
    }

    /// The approved (or pending) reply HTML, where one exists.
    pub fn reply(&self) -> Option<&str> {
        match &self.state {
            ReplyState::AwaitingReplyReview { reply, .. } => reply.as_deref(),
            ReplyState::AwaitingRecipient { reply } | ReplyState::Sending { reply } => {
                Some(reply)
            }
            _ => None,
        }
    }

    /// Advance the flow with one user input.
    pub fn advance(&mut self, input: &str) -> Step<ReplyAction> {
        let input = input.trim();
        let state = std::mem::replace(&mut self.state, ReplyState::AwaitingInquiry);

        let (next, step) = match state {
            ReplyState::AwaitingInquiry => {
                if input.is_empty() {
                    (
                        ReplyState::AwaitingInquiry,
                        Step::prompt("Paste the inquiry you want to answer:"),
                    )
                } else {
                    let inquiry = input.to_string();
                    (
                        ReplyState::AwaitingReplyReview {
                            inquiry: inquiry.clone(),
                            reply: None,
                        },
                        Step {
                            prompt: "Drafting a reply...".into(),
                            action: Some(ReplyAction::GenerateReply { inquiry }),
                        },
                    )
                }
            }

            ReplyState::AwaitingReplyReview {
                inquiry,
                reply: None,
            } => (
                ReplyState::AwaitingReplyReview {
                    inquiry,
                    reply: None,
                },
                Step::prompt("The reply is still being generated, one moment."),
            ),

            ReplyState::AwaitingReplyReview {
                inquiry,
                reply: Some(reply),
            } => {
                if input.eq_ignore_ascii_case("yes") {
                    (
                        ReplyState::AwaitingRecipient { reply },
                        Step::prompt(
                            "Reply approved. Please enter the recipient's email address:",
                        ),
                    )
                } else {
                    // Anything but approval is a correction; regenerate.
                    let inquiry = format!("{inquiry}\nCorrections: {input}");
                    (
                        ReplyState::AwaitingReplyReview {
                            inquiry: inquiry.clone(),
                            reply: None,
                        },
                        Step {
                            prompt: "Applying your corrections...".into(),
                            action: Some(ReplyAction::GenerateReply { inquiry }),
                        },
                    )
                }
            }

            ReplyState::AwaitingRecipient { reply } => {
                if is_valid_email(input) {
                    let to = input.to_string();
                    (
                        ReplyState::Sending { reply },
                        Step {
                            prompt: "Sending the reply...".into(),
                            action: Some(ReplyAction::SendReply { to }),
                        },
                    )
                } else {
                    (
                        ReplyState::AwaitingRecipient { reply },
                        Step::prompt("Please enter a valid email address."),
                    )
                }
            }

            state @ ReplyState::Sending { .. } => {
                (state, Step::prompt("The send is already underway."))
            }
        };

        self.state = next;
        step
    }

    /// Feed a generated reply back into the flow. Returns the review prompt,
    /// or a re-prompt if the flow is not waiting for one.
    pub fn reply_ready(&mut self, reply: String) -> Step<ReplyAction> {
        match &mut self.state {
            ReplyState::AwaitingReplyReview {
                reply: pending @ None,
                ..
            } => {
                let prompt = format!(
                    "Here is a reply draft:\n{reply}\n\n\
                     Do you approve this reply? Type 'yes' to approve, or provide your corrections.",
                );
                *pending = Some(reply);
                Step::prompt(prompt)
            }
            _ => Step::prompt("No reply was requested at this point."),
        }
    }

    /// Report that reply generation failed. The flow returns to the inquiry
    /// step so the user can try again.
    pub fn reply_failed(&mut self) -> Step<ReplyAction> {
        let state = std::mem::replace(&mut self.state, ReplyState::AwaitingInquiry);
        self.state = match state {
            ReplyState::AwaitingReplyReview { .. } => ReplyState::AwaitingInquiry,
            other => other,
        };
        Step::prompt("Failed to generate a reply, please paste the inquiry again.")
    }
}
