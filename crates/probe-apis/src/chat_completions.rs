//! Chat completions catalog
//!
//! The seed registry holds [`Messages`] and [`Model`]; every other request
//! parameter lives in the main registry. [`suites`] also adds the streaming
//! cases, which only this API has.

use crate::ApiError;
use probe_factor::{append_field, set_field, Factor, FactorKind, FactorRegistry, FactorSet, Payload, TestSuite};
use probe_scenario::{create_scenarios, Scenario};
use serde_json::{json, Value};
use tracing::debug;

const INSTRUCTION: &str = "You are a helpful assistant.";
const GREETING: &str = "Hello, how can I help you?";
const IMAGE_QUESTION: &str = "What is in the image?";

const IMAGE_EXTERNAL: &str = "https://upload.wikimedia.org/wikipedia/commons/6/6b/Lycopodium_clavatum_-_K%C3%B6hler%E2%80%93s_Medizinal-Pflanzen-219_%28extracted%29.jpg";
const IMAGE_EXTERNAL_LARGE: &str = "https://upload.wikimedia.org/wikipedia/commons/8/8f/Erciyes_Volcano%2C_Cappadocia.jpg";
const IMAGE_MISSING: &str = "https://github.com/foo/bar/baz.jpg";
/// 1x1 transparent PNG
const IMAGE_BASE64: &str =
    "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

fn turn(role: &str, content: Value) -> Value {
    json!({ "role": role, "content": content })
}

fn text_part(text: &str) -> Value {
    json!({ "text": text, "type": "text" })
}

fn refusal_part(text: &str) -> Value {
    json!({ "text": text, "type": "refusal" })
}

/// Content part with a well-formed body but an arbitrary type tag
fn tagged_part(tag: &str) -> Value {
    json!({ "text": "Hello", "type": tag })
}

fn image_part(url: &str, detail: Option<&str>) -> Value {
    let mut image = json!({ "url": url });
    if let (Some(detail), Some(obj)) = (detail, image.as_object_mut()) {
        obj.insert("detail".to_string(), json!(detail));
    }
    json!({ "image_url": image, "type": "image_url" })
}

fn user_image(url: &str, detail: Option<&str>) -> Vec<Value> {
    vec![
        turn("system", json!(INSTRUCTION)),
        turn("user", json!([text_part(IMAGE_QUESTION), image_part(url, detail)])),
    ]
}

/// System instruction, user greeting, then the given assistant content
fn with_assistant(content: Value) -> Vec<Value> {
    vec![
        turn("system", json!(INSTRUCTION)),
        turn("user", json!("Hello")),
        turn("assistant", content),
    ]
}

/// Given instruction turn followed by a plain user greeting
fn before_user(role: &str, content: Value) -> Vec<Value> {
    vec![turn(role, content), turn("user", json!("Hello"))]
}

/// Conversation prefix; each variant appends its turns to `messages`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Messages {
    Empty,
    BlankUser,
    BlankAssistant,
    BlankSystem,
    BlankDeveloper,
    BlankSystemAndUser,
    UserUnknownPart,
    OnlySystem,
    OnlyUser,
    OnlyAssistant,
    OnlyDeveloper,
    SystemAndUser,
    SystemAndAssistant,
    SystemAndDeveloper,
    UserAndAssistant,
    AssistantAndDeveloper,
    History,
    UserImage,
    UserImageExternalNotExists,
    UserImageBase64Corrupt,
    UserImageBase64,
    UserImageLowExternal,
    UserImageLowBase64,
    UserImageHighExternal,
    UserImageHighBase64,
    UserImageAutoExternal,
    UserImageAutoBase64,
    AssistantUnknownPart,
    AssistantBlankType,
    AssistantTextBlank,
    AssistantTextHello,
    AssistantTextMultiple,
    AssistantRefusalBlank,
    AssistantRefusal,
    AssistantMultipleRefusal,
    AssistantMixed,
    SystemUnknownPart,
    SystemBlankType,
    SystemTextBlank,
    SystemTextInstruction,
    SystemMultiple,
    DeveloperUnknownPart,
    DeveloperBlankType,
    DeveloperTextBlank,
    DeveloperTextInstruction,
    DeveloperMultiple,
}

impl Messages {
    /// Turns appended to the payload, in order
    #[must_use]
    pub fn turns(&self) -> Vec<Value> {
        use Messages::*;

        let corrupt = &IMAGE_BASE64[20..];
        match self {
            Empty => Vec::new(),
            BlankUser => vec![turn("user", json!(""))],
            BlankAssistant => vec![turn("assistant", json!(""))],
            BlankSystem => vec![turn("system", json!(""))],
            BlankDeveloper => vec![turn("developer", json!(""))],
            BlankSystemAndUser => vec![turn("system", json!("")), turn("user", json!(""))],
            UserUnknownPart => vec![turn("user", json!([tagged_part("unknown")]))],
            OnlySystem => vec![turn("system", json!(INSTRUCTION))],
            OnlyUser => vec![turn("user", json!("Hello"))],
            OnlyAssistant => vec![turn("assistant", json!(GREETING))],
            OnlyDeveloper => vec![turn("developer", json!(INSTRUCTION))],
            SystemAndUser => vec![turn("system", json!(INSTRUCTION)), turn("user", json!("Hello"))],
            SystemAndAssistant => vec![turn("system", json!(INSTRUCTION)), turn("assistant", json!(GREETING))],
            SystemAndDeveloper => vec![turn("system", json!(INSTRUCTION)), turn("developer", json!(INSTRUCTION))],
            UserAndAssistant => vec![turn("user", json!("Hello")), turn("assistant", json!(GREETING))],
            AssistantAndDeveloper => vec![turn("developer", json!(INSTRUCTION)), turn("assistant", json!(GREETING))],
            History => vec![
                turn("system", json!(INSTRUCTION)),
                turn("user", json!("Hello")),
                turn("assistant", json!(GREETING)),
                turn("user", json!("Hello")),
            ],
            UserImage => user_image(IMAGE_EXTERNAL, None),
            UserImageExternalNotExists => user_image(IMAGE_MISSING, None),
            UserImageBase64Corrupt => user_image(corrupt, None),
            UserImageBase64 => user_image(IMAGE_BASE64, None),
            UserImageLowExternal => user_image(IMAGE_EXTERNAL, Some("low")),
            UserImageLowBase64 => user_image(IMAGE_BASE64, Some("low")),
            UserImageHighExternal => user_image(IMAGE_EXTERNAL_LARGE, Some("high")),
            UserImageHighBase64 => user_image(IMAGE_BASE64, Some("high")),
            UserImageAutoExternal => user_image(IMAGE_EXTERNAL_LARGE, Some("auto")),
            UserImageAutoBase64 => user_image(IMAGE_BASE64, Some("auto")),
            AssistantUnknownPart => with_assistant(json!([tagged_part("unknown")])),
            AssistantBlankType => with_assistant(json!([tagged_part("")])),
            AssistantTextBlank => with_assistant(json!([text_part("")])),
            AssistantTextHello => with_assistant(json!([text_part(GREETING)])),
            AssistantTextMultiple => with_assistant(json!([
                text_part(GREETING),
                text_part("Seriously bro, do not hesitate to ask me anything!")
            ])),
            AssistantRefusalBlank => with_assistant(json!([refusal_part("")])),
            AssistantRefusal => with_assistant(json!([refusal_part("I refuse to answer this question.")])),
            AssistantMultipleRefusal => with_assistant(json!([
                refusal_part("I refuse to answer this question."),
                refusal_part("For real!")
            ])),
            AssistantMixed => with_assistant(json!([
                text_part(GREETING),
                refusal_part("I refuse to answer this question.")
            ])),
            SystemUnknownPart => before_user("system", json!([tagged_part("unknown")])),
            SystemBlankType => before_user("system", json!([tagged_part("")])),
            SystemTextBlank => before_user("system", json!([text_part("")])),
            SystemTextInstruction => before_user("system", json!([text_part(INSTRUCTION)])),
            SystemMultiple => before_user(
                "system",
                json!([text_part(INSTRUCTION), text_part("You are a very helpful assistant.")]),
            ),
            DeveloperUnknownPart => before_user("developer", json!([tagged_part("unknown")])),
            DeveloperBlankType => before_user("developer", json!([tagged_part("")])),
            DeveloperTextBlank => before_user("developer", json!([text_part("")])),
            DeveloperTextInstruction => before_user("developer", json!([text_part(INSTRUCTION)])),
            DeveloperMultiple => before_user(
                "developer",
                json!([text_part(INSTRUCTION), text_part("You are a very helpful assistant.")]),
            ),
        }
    }

    fn label(&self) -> &'static str {
        use Messages::*;

        match self {
            Empty => "EMPTY",
            BlankUser => "BLANK_USER_MESSAGE",
            BlankAssistant => "BLANK_ASSISTANT_MESSAGE",
            BlankSystem => "BLANK_SYSTEM_MESSAGE",
            BlankDeveloper => "BLANK_DEVELOPER_MESSAGE",
            BlankSystemAndUser => "BLANK_SYSTEM_AND_USER_MESSAGE",
            UserUnknownPart => "USER_MESSAGE_UNKNOWN_PART",
            OnlySystem => "ONLY_SYSTEM_MESSAGE",
            OnlyUser => "ONLY_USER_MESSAGE",
            OnlyAssistant => "ONLY_ASSISTANT_MESSAGE",
            OnlyDeveloper => "ONLY_DEVELOPER_MESSAGE",
            SystemAndUser => "SYSTEM_AND_USER_MESSAGE",
            SystemAndAssistant => "SYSTEM_AND_ASSISTANT_MESSAGE",
            SystemAndDeveloper => "SYSTEM_AND_DEVELOPER_MESSAGE",
            UserAndAssistant => "USER_AND_ASSISTANT_MESSAGE",
            AssistantAndDeveloper => "ASSISTANT_AND_DEVELOPER_MESSAGE",
            History => "HISTORY",
            UserImage => "USER_IMAGE_MESSAGE",
            UserImageExternalNotExists => "USER_IMAGE_EXTERNAL_NOT_EXISTS",
            UserImageBase64Corrupt => "USER_IMAGE_BASE64_CORRUPT",
            UserImageBase64 => "USER_IMAGE_BASE64",
            UserImageLowExternal => "USER_IMAGE_LOW_EXTERNAL",
            UserImageLowBase64 => "USER_IMAGE_LOW_BASE64",
            UserImageHighExternal => "USER_IMAGE_HIGH_EXTERNAL",
            UserImageHighBase64 => "USER_IMAGE_HIGH_BASE64",
            UserImageAutoExternal => "USER_IMAGE_AUTO_EXTERNAL",
            UserImageAutoBase64 => "USER_IMAGE_AUTO_BASE64",
            AssistantUnknownPart => "ASSISTANT_UNKNOWN_PART",
            AssistantBlankType => "ASSISTANT_BLANK_TYPE",
            AssistantTextBlank => "ASSISTANT_TEXT_BLANK",
            AssistantTextHello => "ASSISTANT_TEXT_HELLO",
            AssistantTextMultiple => "ASSISTANT_TEXT_MULTIPLE",
            AssistantRefusalBlank => "ASSISTANT_REFUSAL_BLANK",
            AssistantRefusal => "ASSISTANT_REFUSAL",
            AssistantMultipleRefusal => "ASSISTANT_MULTIPLE_REFUSAL",
            AssistantMixed => "ASSISTANT_MIXED",
            SystemUnknownPart => "SYSTEM_UNKNOWN_PART",
            SystemBlankType => "SYSTEM_BLANK_TYPE",
            SystemTextBlank => "SYSTEM_TEXT_BLANK",
            SystemTextInstruction => "SYSTEM_TEXT_INSTRUCTION",
            SystemMultiple => "SYSTEM_MULTIPLE",
            DeveloperUnknownPart => "DEVELOPER_UNKNOWN_PART",
            DeveloperBlankType => "DEVELOPER_BLANK_TYPE",
            DeveloperTextBlank => "DEVELOPER_TEXT_BLANK",
            DeveloperTextInstruction => "DEVELOPER_TEXT_INSTRUCTION",
            DeveloperMultiple => "DEVELOPER_MULTIPLE",
        }
    }
}

impl FactorKind for Messages {
    const KIND: &'static str = "messages";

    fn variants() -> &'static [Self] {
        use Messages::*;

        &[
            Empty,
            BlankUser,
            BlankAssistant,
            BlankSystem,
            BlankDeveloper,
            BlankSystemAndUser,
            UserUnknownPart,
            OnlySystem,
            OnlyUser,
            OnlyAssistant,
            OnlyDeveloper,
            SystemAndUser,
            SystemAndAssistant,
            SystemAndDeveloper,
            UserAndAssistant,
            AssistantAndDeveloper,
            History,
            UserImage,
            UserImageExternalNotExists,
            UserImageBase64Corrupt,
            UserImageBase64,
            UserImageLowExternal,
            UserImageLowBase64,
            UserImageHighExternal,
            UserImageHighBase64,
            UserImageAutoExternal,
            UserImageAutoBase64,
            AssistantUnknownPart,
            AssistantBlankType,
            AssistantTextBlank,
            AssistantTextHello,
            AssistantTextMultiple,
            AssistantRefusalBlank,
            AssistantRefusal,
            AssistantMultipleRefusal,
            AssistantMixed,
            SystemUnknownPart,
            SystemBlankType,
            SystemTextBlank,
            SystemTextInstruction,
            SystemMultiple,
            DeveloperUnknownPart,
            DeveloperBlankType,
            DeveloperTextBlank,
            DeveloperTextInstruction,
            DeveloperMultiple,
        ]
    }

    fn name(&self) -> String {
        self.label().to_string()
    }

    fn is_primary(&self) -> bool {
        matches!(self, Messages::SystemAndUser)
    }

    fn apply(&self, target: &mut Payload) {
        for turn in self.turns() {
            append_field(target, "messages", turn);
        }
    }
}

field_kind! {
    Model = "model" {
        Blank(true, false) => json!(""),
        Unknown(true, false) => json!("foo"),
        Gpt35Turbo(false, false) => json!("gpt-3.5-turbo"),
        Gpt4(false, false) => json!("gpt-4"),
        Gpt4o(false, false) => json!("gpt-4o"),
        Gpt4oAudioPreview(false, false) => json!("gpt-4o-audio-preview"),
    }
}

field_kind! {
    /// Audio output format and voice
    Audio = "audio" {
        UnknownFormat(true, false) => json!({"format": "foo", "voice": "alloy"}),
        UnknownVoice(true, false) => json!({"format": "wav", "voice": "foo"}),
        Wav(false, true) => json!({"format": "wav", "voice": "alloy"}),
        Mp3(false, false) => json!({"format": "mp3", "voice": "ash"}),
        Flac(false, false) => json!({"format": "flac", "voice": "ballad"}),
        Opus(false, false) => json!({"format": "opus", "voice": "coral"}),
        Pcm16(false, false) => json!({"format": "pcm16", "voice": "echo"}),
    }
}

field_kind! {
    /// Accepted range is -2.0 to 2.0
    FrequencyPenalty = "frequency_penalty" {
        NotANumber(true, false) => json!("foo"),
        Minus(false, false) => json!(-1),
        Zero(false, false) => json!(0),
        One(false, true) => json!(1),
        Two(false, false) => json!(2),
        Billion(true, false) => json!(1_000_000_000),
    }
}

field_kind! {
    /// Token id to bias; accepted range is -100 to 100
    LogitBias = "logit_bias" {
        NotAMap(true, false) => json!("foo"),
        Empty(false, false) => json!({}),
        MustHave(false, true) => json!({"12345": 100}),
        MustBan(false, false) => json!({"12345": -100}),
        InvalidPositiveBias(true, false) => json!({"12345": 10000}),
        InvalidNegativeBias(true, false) => json!({"12345": -10000}),
    }
}

field_kind! {
    Logprobs = "logprobs" {
        NotABoolean(true, false) => json!("foo"),
        True(false, true) => json!(true),
        False(false, false) => json!(false),
    }
}

field_kind! {
    MaxCompletionTokens = "max_completion_tokens" {
        NotANumber(true, false) => json!("foo"),
        Minus(true, false) => json!(-1),
        Zero(true, false) => json!(0),
        One(false, true) => json!(1),
        Two(false, false) => json!(2),
        Billion(true, false) => json!(1_000_000_000),
    }
}

field_kind! {
    /// Deprecated in favor of `max_completion_tokens`, still accepted
    MaxTokens = "max_tokens" {
        NotANumber(true, false) => json!("foo"),
        Minus(true, false) => json!(-1),
        Zero(true, false) => json!(0),
        One(false, true) => json!(1),
        Two(false, false) => json!(2),
        Billion(true, false) => json!(1_000_000_000),
    }
}

field_kind! {
    /// Up to 16 pairs; keys at most 64 characters, values at most 512
    Metadata = "metadata" {
        NotAMap(true, false) => json!("foo"),
        Empty(false, false) => json!({}),
        Single(false, true) => json!({"foo": "bar"}),
        Multiple(false, false) => json!({"foo": "bar", "baz": "qux"}),
        LongKey(true, false) => json!({"12345678901234567890123456789012345678901234567890123456789012345": "foo"}),
        LongValue(true, false) => json!({"foo": "a".repeat(513)}),
    }
}

field_kind! {
    Modalities = "modalities" {
        Blank(true, false) => json!([""]),
        Unknown(true, false) => json!(["UNKNOWN"]),
        Text(false, true) => json!(["text"]),
        Audio(false, false) => json!(["audio"]),
        TextAndAudio(false, false) => json!(["text", "audio"]),
    }
}

field_kind! {
    /// Number of choices to generate
    N = "n" {
        NotANumber(true, false) => json!("foo"),
        Minus(true, false) => json!(-1),
        Zero(true, false) => json!(0),
        One(false, true) => json!(1),
        Two(false, false) => json!(2),
        Million(true, false) => json!(1_000_000),
    }
}

field_kind! {
    ParallelToolCalls = "parallel_tool_calls" {
        NotABoolean(true, false) => json!("foo"),
        True(false, true) => json!(true),
        False(false, false) => json!(false),
    }
}

/// Predicted output content, as text parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prediction {
    Blank,
    Hello,
    Multiple,
    MultipleWithBlank,
}

impl Prediction {
    #[must_use]
    pub fn texts(&self) -> &'static [&'static str] {
        match self {
            Prediction::Blank => &[""],
            Prediction::Hello => &["Hello"],
            Prediction::Multiple => &["Hello", "World"],
            Prediction::MultipleWithBlank => &["Hello", ""],
        }
    }
}

impl FactorKind for Prediction {
    const KIND: &'static str = "prediction";

    fn variants() -> &'static [Self] {
        &[
            Prediction::Blank,
            Prediction::Hello,
            Prediction::Multiple,
            Prediction::MultipleWithBlank,
        ]
    }

    fn name(&self) -> String {
        format!("prediction={}", crate::render(&json!(self.texts())))
    }

    fn is_primary(&self) -> bool {
        matches!(self, Prediction::Hello)
    }

    fn apply(&self, target: &mut Payload) {
        let content: Vec<Value> = self.texts().iter().map(|text| json!({"type": "text", "text": text})).collect();
        set_field(target, "prediction", json!({"type": "content", "content": content}));
    }
}

field_kind! {
    /// Accepted range is -2.0 to 2.0
    PresencePenalty = "presence_penalty" {
        NotANumber(true, false) => json!("foo"),
        MinusThree(true, false) => json!(-3),
        MinusTwo(false, false) => json!(-2),
        Zero(false, false) => json!(0),
        One(false, true) => json!(1),
        Two(false, false) => json!(2),
        Three(true, false) => json!(3),
        Billion(true, false) => json!(1_000_000_000),
    }
}

field_kind! {
    ReasoningEffort = "reasoning_effort" {
        Unknown(true, false) => json!("foo"),
        Low(false, true) => json!("low"),
        Medium(false, false) => json!("medium"),
        High(false, false) => json!("high"),
    }
}

field_kind! {
    ResponseFormat = "response_format" {
        Unknown(true, false) => json!("foo"),
        Text(false, true) => json!({"type": "text"}),
        JsonObject(false, false) => json!({"type": "json_object"}),
    }
}

field_kind! {
    Seed = "seed" {
        NotANumber(true, false) => json!("foo"),
        Minus(false, false) => json!(-1),
        Zero(false, false) => json!(0),
        One(false, true) => json!(1),
        Two(false, false) => json!(2),
    }
}

field_kind! {
    ServiceTier = "service_tier" {
        Unknown(true, false) => json!("foo"),
        Auto(false, true) => json!("auto"),
        Default(false, false) => json!("default"),
    }
}

field_kind! {
    /// Up to 4 stop sequences
    Stop = "stop" {
        InvalidType(false, false) => json!(123),
        Blank(false, false) => json!(""),
        Empty(false, true) => json!([]),
        Single(false, false) => json!("foo"),
        Multiple(false, false) => json!(["foo", "bar"]),
        Long(true, false) => json!("a".repeat(10_000)),
    }
}

field_kind! {
    Store = "store" {
        NotABoolean(true, false) => json!("foo"),
        True(false, false) => json!(true),
        False(false, true) => json!(false),
    }
}

field_kind! {
    Stream = "stream" {
        NotABoolean(true, false) => json!("foo"),
        Blank(false, false) => Value::Null,
        True(false, false) => json!(true),
        False(false, false) => json!(false),
    }
}

field_kind! {
    /// Blank sends an empty options object
    StreamOptions = "stream_options" {
        NotABoolean(true, false) => json!({"include_usage": "foo"}),
        Blank(false, true) => json!({}),
        True(false, false) => json!({"include_usage": true}),
        False(false, true) => json!({"include_usage": false}),
    }
}

field_kind! {
    /// Accepted range is 0 to 2
    Temperature = "temperature" {
        NotANumber(true, false) => json!("foo"),
        Minus(true, false) => json!(-1),
        Zero(false, false) => json!(0),
        One(false, true) => json!(1),
        Two(false, false) => json!(2),
        Billion(true, false) => json!(1_000_000_000),
    }
}

field_kind! {
    /// Accepted range is 0 to 20; requires `logprobs`
    TopLogprobs = "top_logprobs" {
        NotANumber(true, false) => json!("foo"),
        Minus(true, false) => json!(-1),
        Zero(false, false) => json!(0),
        One(false, true) => json!(1),
        Twenty(false, false) => json!(20),
        Billion(true, false) => json!(1_000_000_000),
    }
}

field_kind! {
    /// Accepted range is 0 to 1
    TopP = "top_p" {
        NotANumber(true, false) => json!("foo"),
        Minus(true, false) => json!(-1),
        Zero(false, false) => json!(0),
        One(false, true) => json!(1),
        Two(true, false) => json!(2),
        Billion(true, false) => json!(1_000_000_000),
    }
}

field_kind! {
    /// End-user identifier
    User = "user" {
        NotAString(true, false) => json!(123),
        Blank(false, false) => json!(""),
        Somebody(false, true) => json!("somebody"),
    }
}

/// Models every negative and sanity case is run against
pub const MODELS: [Model; 3] = [Model::Gpt4, Model::Gpt4o, Model::Gpt4oAudioPreview];

pub fn seed_registry() -> FactorRegistry {
    let mut registry = FactorRegistry::new();
    registry.register_kind::<Messages>().register_kind::<Model>();
    registry
}

pub fn main_registry() -> FactorRegistry {
    let mut registry = FactorRegistry::new();
    registry
        .register_kind::<Audio>()
        .register_kind::<FrequencyPenalty>()
        .register_kind::<LogitBias>()
        .register_kind::<Logprobs>()
        .register_kind::<MaxCompletionTokens>()
        .register_kind::<MaxTokens>()
        .register_kind::<Metadata>()
        .register_kind::<Modalities>()
        .register_kind::<N>()
        .register_kind::<ParallelToolCalls>()
        .register_kind::<Prediction>()
        .register_kind::<PresencePenalty>()
        .register_kind::<ReasoningEffort>()
        .register_kind::<ResponseFormat>()
        .register_kind::<Seed>()
        .register_kind::<ServiceTier>()
        .register_kind::<Stop>()
        .register_kind::<Store>()
        .register_kind::<Stream>()
        .register_kind::<StreamOptions>()
        .register_kind::<Temperature>()
        .register_kind::<TopLogprobs>()
        .register_kind::<TopP>()
        .register_kind::<User>();
    registry
}

/// Every suite of the chat completions catalog, in emission order
///
/// # Errors
/// Returns [`ApiError::Registry`] if the pairwise suite cannot be built
pub fn suites() -> Result<Vec<TestSuite>, ApiError> {
    let main = main_registry();
    let seed = seed_registry();
    let happy_messages = Messages::SystemAndUser.factor();
    let mut suites = Vec::new();

    let negative = main.negative_suite("negative");
    for model in MODELS {
        suites.push(negative.extend(&[model.factor(), happy_messages.clone()]));
    }

    let negative_seed = seed.negative_suite("negative_seed");
    for model in MODELS {
        suites.push(negative_seed.extend(&[model.factor()]));
    }

    suites.push(TestSuite::new(
        [Model::Blank, Model::Unknown]
            .into_iter()
            .map(|model| FactorSet::singleton(model.factor(), "negative_model"))
            .collect(),
    ));

    let sanity = main.sanity_suite("sanity").product(&seed.sanity_suite("seed_sanity"));
    for model in MODELS {
        suites.push(sanity.extend(&[model.factor()]));
    }

    let messages: Vec<Factor> = Messages::variants().iter().map(|m| m.factor()).collect();
    suites.push(TestSuite::singletons(&messages, "message").extend(&[Model::Gpt4.factor()]));

    // one model only; the pairwise suite is the largest
    let pairwise = main.combination_suite("pairwise", 2)?;
    suites.push(pairwise.extend(&[Model::Gpt4.factor(), happy_messages]));

    let streaming = sanity
        .extend(&[Model::Gpt4o.factor(), Stream::True.factor()])
        .regroup("streaming");
    for options in [
        StreamOptions::True,
        StreamOptions::False,
        StreamOptions::Blank,
        StreamOptions::NotABoolean,
    ] {
        suites.push(streaming.extend(&[options.factor()]));
    }

    debug!(suites = suites.len(), "composed chat completions suites");
    Ok(suites)
}

/// Scenarios for every chat completions suite, starting from an empty payload
///
/// # Errors
/// Returns [`ApiError::Registry`] if suite composition fails
pub fn scenarios() -> Result<Vec<Scenario>, ApiError> {
    Ok(create_scenarios(&suites()?, Payload::new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use probe_scenario::scenario_map;

    fn non_negative_sizes(registry: &FactorRegistry) -> Vec<usize> {
        registry
            .kinds()
            .filter_map(|kind| registry.bucket(kind))
            .map(|bucket| bucket.iter().filter(|f| !f.is_negative()).count())
            .collect()
    }

    #[test]
    fn registries_hold_every_kind() {
        assert_eq!(seed_registry().kinds().collect::<Vec<_>>(), vec!["messages", "model"]);
        let main = main_registry();
        assert_eq!(main.kinds().count(), 24);
        assert_eq!(main.kinds().next(), Some("audio"));
        assert_eq!(main.kinds().last(), Some("user"));
    }

    #[test]
    fn no_factor_is_both_negative_and_primary() {
        for registry in [seed_registry(), main_registry()] {
            for factor in registry.factors() {
                assert!(!(factor.is_negative() && factor.is_primary()), "{}", factor.name());
            }
        }
    }

    #[test]
    fn names_are_unique_within_a_kind() {
        for registry in [seed_registry(), main_registry()] {
            for kind in registry.kinds().collect::<Vec<_>>() {
                let bucket = registry.bucket(kind).unwrap();
                let mut names: Vec<&str> = bucket.iter().map(Factor::name).collect();
                names.sort_unstable();
                names.dedup();
                assert_eq!(names.len(), bucket.len(), "duplicate names in {kind}");
            }
        }
    }

    #[test]
    fn messages_append_turns_in_order() {
        let mut payload = Payload::new();
        Messages::History.apply(&mut payload);
        let roles: Vec<&str> = payload["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }

    #[test]
    fn empty_messages_leave_payload_untouched() {
        let mut payload = Payload::new();
        Messages::Empty.apply(&mut payload);
        assert!(payload.is_empty());
    }

    #[test]
    fn image_detail_is_omitted_when_unset() {
        let turns = Messages::UserImage.turns();
        let image = &turns[1]["content"][1]["image_url"];
        assert_eq!(image, &json!({"url": IMAGE_EXTERNAL}));

        let turns = Messages::UserImageLowBase64.turns();
        assert_eq!(turns[1]["content"][1]["image_url"]["detail"], json!("low"));
    }

    #[test]
    fn special_payload_shapes() {
        let mut payload = Payload::new();
        Prediction::Multiple.apply(&mut payload);
        StreamOptions::Blank.apply(&mut payload);
        Audio::Mp3.apply(&mut payload);
        Stream::Blank.apply(&mut payload);

        assert_eq!(
            payload["prediction"],
            json!({"type": "content", "content": [
                {"type": "text", "text": "Hello"},
                {"type": "text", "text": "World"}
            ]})
        );
        assert_eq!(payload["stream_options"], json!({}));
        assert_eq!(payload["audio"], json!({"format": "mp3", "voice": "ash"}));
        assert_eq!(payload["stream"], Value::Null);
        assert_eq!(Prediction::Hello.name(), r#"prediction=["Hello"]"#);
    }

    #[test]
    fn suite_sizes() {
        let suites = suites().unwrap();
        let sizes: Vec<usize> = suites.iter().map(TestSuite::len).collect();

        let buckets = non_negative_sizes(&main_registry());
        let total: usize = buckets.iter().sum();
        let squares: usize = buckets.iter().map(|n| n * n).sum();
        let pairwise = (total * total - squares) / 2;

        assert_eq!(
            sizes,
            vec![49, 49, 49, 2, 2, 2, 2, 24, 24, 24, 46, pairwise, 24, 24, 24, 24]
        );
        assert_eq!(pairwise, 2337);
    }

    #[test]
    fn groups_present() {
        let scenarios = scenario_map(scenarios().unwrap());
        let groups: std::collections::BTreeSet<&str> = scenarios.values().map(|s| s.group()).collect();
        for group in ["negative", "negative_seed", "negative_model", "sanity", "message", "pairwise", "streaming"] {
            assert!(groups.contains(group), "missing {group}");
        }
    }

    #[test]
    fn streaming_cases_stream() {
        for scenario in scenarios().unwrap().iter().filter(|s| s.group() == "streaming") {
            assert_eq!(scenario.request_body["stream"], json!(true));
            assert_eq!(scenario.request_body["model"], json!("gpt-4o"));
            assert!(scenario.request_body.contains_key("stream_options"));
        }
    }
}
