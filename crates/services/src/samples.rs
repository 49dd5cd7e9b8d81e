/// Quizzes seeded into an empty store: one in each question shape.
pub const SAMPLE_QUIZZES_JSON: &str = include_str!("../data/sample_quizzes.json");
