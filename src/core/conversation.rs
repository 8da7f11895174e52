use crate::core::directory::{clip_query, BranchMatch, IfscDirectory};
use crate::domain::model::{
    BranchRecord, ConversationState, IfscCode, InlineKeyboardMarkup, OutgoingMessage,
    QueryOutcome,
};
use std::time::{Duration, Instant};

pub const DEFAULT_WEBSITE_URL: &str = "https://pmetromart.in/ifsc/";
pub const DEFAULT_MATCH_THRESHOLD: f64 = 60.0;
pub const DEFAULT_CONVERSATION_TIMEOUT: Duration = Duration::from_secs(60);

const WEBSITE_BUTTON_TEXT: &str = "🌐 Visit Website";
const MARKDOWN: &str = "Markdown";

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSettings {
    pub match_threshold: f64,
    pub timeout: Duration,
    pub website_url: String,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            timeout: DEFAULT_CONVERSATION_TIMEOUT,
            website_url: DEFAULT_WEBSITE_URL.to_string(),
        }
    }
}

/// A parsed chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Start,
    Cancel,
    Help,
    /// `/ifsc <code>`; the argument may be empty.
    Ifsc(String),
    OtherCommand(String),
    Text(String),
}

impl Input {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let Some(command_line) = trimmed.strip_prefix('/') else {
            return Input::Text(trimmed.to_string());
        };

        let (command, argument) = match command_line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (command_line, ""),
        };
        // 群組中指令會帶 @botname
        let command = command.split('@').next().unwrap_or_default().to_lowercase();

        match command.as_str() {
            "start" => Input::Start,
            "cancel" => Input::Cancel,
            "help" => Input::Help,
            "ifsc" => Input::Ifsc(argument.to_string()),
            _ => Input::OtherCommand(command),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub markdown: bool,
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl Reply {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: false,
            reply_markup: None,
        }
    }

    fn markdown(text: impl Into<String>) -> Self {
        Self {
            markdown: true,
            ..Self::plain(text)
        }
    }

    fn with_markup(mut self, markup: InlineKeyboardMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }

    pub fn into_message(self, chat_id: i64) -> OutgoingMessage {
        OutgoingMessage {
            chat_id,
            text: self.text,
            parse_mode: self.markdown.then(|| MARKDOWN.to_string()),
            reply_markup: self.reply_markup,
        }
    }
}

/// What should be written to the query log for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedQuery {
    pub state: Option<String>,
    pub bank: Option<String>,
    pub branch: Option<String>,
    pub ifsc: Option<String>,
    pub outcome: QueryOutcome,
}

impl LoggedQuery {
    fn outcome(outcome: QueryOutcome) -> Self {
        Self {
            state: None,
            bank: None,
            branch: None,
            ifsc: None,
            outcome,
        }
    }

    fn from_record(record: &BranchRecord, outcome: QueryOutcome) -> Self {
        Self {
            state: Some(record.state.clone()),
            bank: Some(record.bank.clone()),
            branch: Some(record.branch.clone()),
            ifsc: Some(record.ifsc.clone()),
            outcome,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Turn {
    pub replies: Vec<Reply>,
    pub logged: Option<LoggedQuery>,
}

impl Turn {
    fn reply(reply: Reply) -> Self {
        Self {
            replies: vec![reply],
            logged: None,
        }
    }

    fn logged(mut self, logged: LoggedQuery) -> Self {
        self.logged = Some(logged);
        self
    }
}

/// Per-user conversation state.
#[derive(Debug, Clone)]
pub struct Session {
    pub state: ConversationState,
    pub last_activity: Instant,
}

impl Session {
    pub fn new(now: Instant) -> Self {
        Self {
            state: ConversationState::Idle,
            last_activity: now,
        }
    }

    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        self.state.is_active() && now.saturating_duration_since(self.last_activity) > timeout
    }
}

/// Escape text for Telegram's legacy `Markdown` parse mode.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn format_branch_details(record: &BranchRecord) -> String {
    format!(
        "🏦 *Bank:* {}\n🌍 *State:* {}\n🏙 *District:* {}\n🏢 *Branch:* {}\n📌 *Address:* {}\n🔑 *IFSC:* `{}`\n💳 *MICR:* {}\n📞 *Contact:* {}",
        escape_markdown(&record.bank),
        escape_markdown(&record.state),
        escape_markdown(&record.district),
        escape_markdown(&record.branch),
        escape_markdown(&record.address),
        record.ifsc.replace('`', ""),
        escape_markdown(&record.micr),
        escape_markdown(&record.contact),
    )
}

/// The State → Bank → Branch dialogue, driven one message at a time.
pub struct Conversation<'a> {
    directory: &'a IfscDirectory,
    settings: &'a ConversationSettings,
}

impl<'a> Conversation<'a> {
    pub fn new(directory: &'a IfscDirectory, settings: &'a ConversationSettings) -> Self {
        Self {
            directory,
            settings,
        }
    }

    fn website_button(&self) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup::single_link(WEBSITE_BUTTON_TEXT, &self.settings.website_url)
    }

    fn end(session: &mut Session) {
        session.state = ConversationState::Idle;
    }

    pub fn handle(&self, session: &mut Session, input: Input, now: Instant) -> Turn {
        if session.is_expired(now, self.settings.timeout) {
            tracing::debug!("⏰ Conversation timed out in state {:?}", session.state);
            Self::end(session);
        }
        session.last_activity = now;

        match input {
            Input::Start => self.start(session),
            Input::Cancel if session.state.is_active() => {
                Self::end(session);
                Turn::reply(Reply::plain("❌ Conversation रद्द कर दिया गया है।"))
                    .logged(LoggedQuery::outcome(QueryOutcome::Cancelled))
            }
            Input::Help => Turn::reply(Reply::plain(help_text())),
            Input::Ifsc(code) => self.lookup_ifsc(&code),
            Input::Text(text) => match session.state.clone() {
                ConversationState::Idle => self.idle_text(&text),
                ConversationState::AwaitingState => self.state_input(session, &text),
                ConversationState::AwaitingBank { state } => self.bank_input(session, state, &text),
                ConversationState::AwaitingBranch { state, bank } => {
                    self.branch_input(session, &state, &bank, &text)
                }
            },
            Input::OtherCommand(_) if !session.state.is_active() => {
                Turn::reply(Reply::plain(help_text()))
            }
            // 對話進行中忽略其他指令
            Input::Cancel | Input::OtherCommand(_) => Turn::default(),
        }
    }

    fn start(&self, session: &mut Session) -> Turn {
        session.state = ConversationState::AwaitingState;
        Turn::reply(
            Reply::markdown("👋 Welcome to IFSC Finder | PMetroMart!\n\nकृपया अपना *State* लिखें:")
                .with_markup(self.website_button()),
        )
    }

    fn state_input(&self, session: &mut Session, text: &str) -> Turn {
        match self.directory.match_state(text, self.settings.match_threshold) {
            Some(state) => {
                session.state = ConversationState::AwaitingBank {
                    state: state.to_string(),
                };
                Turn::reply(Reply::markdown("✅ State मिला! अब *Bank* का नाम भेजें:"))
            }
            None => Turn::reply(
                Reply::plain("❌ State नहीं मिला। आप हमारी website पर भी check कर सकते हैं:")
                    .with_markup(self.website_button()),
            )
            .logged(LoggedQuery {
                state: Some(clip_query(text).to_string()),
                ..LoggedQuery::outcome(QueryOutcome::StateNotFound)
            }),
        }
    }

    fn bank_input(&self, session: &mut Session, state: String, text: &str) -> Turn {
        let user_bank = clip_query(text);
        match self
            .directory
            .normalize_bank_name(user_bank, self.settings.match_threshold)
        {
            Some(bank) => {
                session.state = ConversationState::AwaitingBranch { state, bank };
                Turn::reply(Reply::markdown("✅ Bank मिला! अब *Branch* का नाम भेजें:"))
            }
            None => Turn::reply(
                Reply::plain(format!(
                    "❌ Bank '{}' नहीं मिला।\nआप हमारी website पर भी check कर सकते हैं:",
                    user_bank
                ))
                .with_markup(self.website_button()),
            )
            .logged(LoggedQuery {
                state: Some(state),
                bank: Some(user_bank.to_string()),
                ..LoggedQuery::outcome(QueryOutcome::BankNotFound)
            }),
        }
    }

    fn branch_input(&self, session: &mut Session, state: &str, bank: &str, text: &str) -> Turn {
        let user_branch = clip_query(text).to_uppercase();
        // 分行步驟無論結果都會結束對話
        Self::end(session);

        let missed = |outcome| LoggedQuery {
            state: Some(state.to_string()),
            bank: Some(bank.to_string()),
            branch: Some(user_branch.clone()),
            ..LoggedQuery::outcome(outcome)
        };

        match self
            .directory
            .match_branch(state, bank, &user_branch, self.settings.match_threshold)
        {
            BranchMatch::NoBranches => Turn::reply(
                Reply::plain("❌ कोई branches नहीं मिली। आप website पर भी check कर सकते हैं:")
                    .with_markup(self.website_button()),
            )
            .logged(missed(QueryOutcome::NoBranches)),
            BranchMatch::NotFound => Turn::reply(
                Reply::plain(format!(
                    "❌ Branch '{}' नहीं मिली।\nआप हमारी website पर भी check कर सकते हैं:",
                    user_branch
                ))
                .with_markup(self.website_button()),
            )
            .logged(missed(QueryOutcome::BranchNotFound)),
            BranchMatch::Found(record) => {
                Turn::reply(Reply::markdown(format_branch_details(record)))
                    .logged(LoggedQuery::from_record(record, QueryOutcome::Found))
            }
        }
    }

    fn idle_text(&self, text: &str) -> Turn {
        if IfscCode::parse(text).is_some() {
            return self.lookup_ifsc(text);
        }
        Turn::reply(Reply::plain(
            "👋 IFSC खोजने के लिए /start भेजें, या सीधे IFSC code भेजें (जैसे SBIN0001234)।",
        ))
    }

    fn lookup_ifsc(&self, input: &str) -> Turn {
        let Some(code) = IfscCode::parse(input) else {
            let input = clip_query(input);
            let shown = if input.is_empty() {
                "/ifsc <CODE>".to_string()
            } else {
                input.to_string()
            };
            return Turn::reply(Reply::plain(format!(
                "❌ '{}' एक valid IFSC code नहीं है। (उदाहरण: SBIN0001234)",
                shown
            )))
            .logged(LoggedQuery {
                ifsc: Some(input.to_string()),
                ..LoggedQuery::outcome(QueryOutcome::InvalidIfsc)
            });
        };

        match self.directory.lookup_ifsc(&code) {
            Some(record) => Turn::reply(Reply::markdown(format_branch_details(record)))
                .logged(LoggedQuery::from_record(record, QueryOutcome::IfscFound)),
            None => Turn::reply(
                Reply::plain(format!(
                    "❌ IFSC '{}' नहीं मिला।\nआप हमारी website पर भी check कर सकते हैं:",
                    code
                ))
                .with_markup(self.website_button()),
            )
            .logged(LoggedQuery {
                ifsc: Some(code.to_string()),
                ..LoggedQuery::outcome(QueryOutcome::IfscNotFound)
            }),
        }
    }
}

fn help_text() -> &'static str {
    "ℹ️ IFSC Finder\n\n/start - State → Bank → Branch से IFSC खोजें\n/ifsc <CODE> - IFSC code से branch details\n/cancel - Conversation रद्द करें"
}
