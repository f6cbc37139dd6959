/// One fixed document/query pair and the outcome a correct implementation
/// is expected to produce, mirroring the concrete end-to-end scenarios this
/// system is specified against.
pub struct EvalCase {
    pub name: &'static str,
    pub artifact_type: &'static str,
    pub source_system: &'static str,
    pub content: &'static str,
    pub query: &'static str,
    pub expected_outcome: &'static str,
}

/// A small fixed corpus exercising storage, event extraction, and graph
/// expansion — the outcome harness's acceptance surface.
pub fn corpus() -> Vec<EvalCase> {
    vec![
        EvalCase {
            name: "store-retrieve",
            artifact_type: "note",
            source_system: "eval",
            content: "The pricing decision is freemium for launch.",
            query: "pricing model",
            expected_outcome: "the top recall result is the pricing note itself, discussing a freemium launch pricing decision",
        },
        EvalCase {
            name: "event-extraction",
            artifact_type: "note",
            source_system: "eval",
            content: "Alice committed to ship the API by Friday.",
            query: "who is shipping the API",
            expected_outcome: "a Commitment event whose actor is Alice, owning or contributing to shipping the API by Friday",
        },
        EvalCase {
            name: "database-choice",
            artifact_type: "note",
            source_system: "eval",
            content: "Alice decided to use Postgres.",
            query: "database choice",
            expected_outcome: "a Decision event where Alice chose Postgres as the database",
        },
    ]
}
