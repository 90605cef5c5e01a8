//! Embeddings catalog
//!
//! Seed registry: [`Input`], [`Model`]. Main registry: [`Dimensions`],
//! [`EncodingFormat`], [`User`].

use crate::ApiError;
use probe_factor::{Factor, FactorKind, FactorRegistry, FactorSet, Payload, TestSuite};
use probe_scenario::{create_scenarios, Scenario};
use serde_json::json;
use tracing::debug;

field_kind! {
    /// Text to embed, as a string, strings or token arrays
    Input = "input" {
        InvalidType(true, false) => json!(true),
        BlankString(false, false) => json!(""),
        Text(false, true) => json!("hello"),
        MultipleStrings(false, false) => json!(["foo", "bar"]),
        MinusInt(false, false) => json!([-123]),
        Integers(false, false) => json!([123, 456]),
        ArrayOfIntegers(false, false) => json!([[123, 456], [789, 12]]),
        BlankArray(false, false) => json!([]),
        BlankStringArray(false, false) => json!([""]),
        Mixed(false, false) => json!([123, "foo"]),
    }
}

field_kind! {
    Model = "model" {
        NotAString(true, false) => json!(123),
        Blank(true, false) => json!(""),
        Unknown(true, false) => json!("foo"),
        EmbeddingAda002(false, false) => json!("text-embedding-ada-002"),
        Embedding3Small(false, false) => json!("text-embedding-3-small"),
        Embedding3Large(false, false) => json!("text-embedding-3-large"),
    }
}

field_kind! {
    /// Output dimensionality; only `text-embedding-3` models accept it
    Dimensions = "dimensions" {
        NotANumber(true, false) => json!("123"),
        Blank(true, false) => json!(0),
        D1536(false, true) => json!(1536),
        D4096(false, false) => json!(4096),
        Minus(true, false) => json!(-1),
    }
}

field_kind! {
    EncodingFormat = "encoding_format" {
        NotAString(true, false) => json!(123),
        Blank(true, false) => json!(""),
        Float(false, true) => json!("float"),
        Base64(false, false) => json!("base64"),
        Unknown(true, false) => json!("unknown"),
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
pub const MODELS: [Model; 3] = [Model::EmbeddingAda002, Model::Embedding3Small, Model::Embedding3Large];

pub fn seed_registry() -> FactorRegistry {
    let mut registry = FactorRegistry::new();
    registry.register_kind::<Input>().register_kind::<Model>();
    registry
}

pub fn main_registry() -> FactorRegistry {
    let mut registry = FactorRegistry::new();
    registry
        .register_kind::<Dimensions>()
        .register_kind::<EncodingFormat>()
        .register_kind::<User>();
    registry
}

/// Every suite of the embeddings catalog, in emission order
///
/// # Errors
/// Returns [`ApiError::Registry`] if the pairwise suite cannot be built
pub fn suites() -> Result<Vec<TestSuite>, ApiError> {
    let main = main_registry();
    let seed = seed_registry();
    let happy_input = Input::Text.factor();
    let mut suites = Vec::new();

    let negative = main.negative_suite("negative");
    for model in MODELS {
        suites.push(negative.extend(&[model.factor(), happy_input.clone()]));
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

    let inputs: Vec<Factor> = Input::variants().iter().map(|input| input.factor()).collect();
    suites.push(TestSuite::singletons(&inputs, "input").extend(&[Model::EmbeddingAda002.factor()]));

    // one model only; the pairwise suite is the largest
    let pairwise = main.combination_suite("pairwise", 2)?;
    suites.push(pairwise.extend(&[Model::EmbeddingAda002.factor(), happy_input]));

    debug!(suites = suites.len(), "composed embeddings suites");
    Ok(suites)
}

/// Scenarios for every embeddings suite, starting from an empty payload
///
/// # Errors
/// Returns [`ApiError::Registry`] if suite composition fails
pub fn scenarios() -> Result<Vec<Scenario>, ApiError> {
    Ok(create_scenarios(&suites()?, Payload::new))
}
