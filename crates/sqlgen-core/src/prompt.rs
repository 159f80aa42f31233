use crate::model::Example;

/// The partial opener at the end of every prompt. It primes the model to
/// continue with a query body immediately; validation of whatever comes
/// back happens downstream.
pub const PROMPT_OPENER: &str = "SELECT";

const INSTRUCTION: &str =
    "-- Using valid SQL, answer the following question for the tables provided above.";

pub fn standard_prompt(schema: &str, question: &str) -> String {
    format!("{schema}\n\n{INSTRUCTION}\n-- Question: {question}\n{PROMPT_OPENER}")
}

pub fn few_shot_prompt(schema: &str, question: &str, examples: &[Example]) -> String {
    let mut prompt = format!(
        "{schema}\n\n-- Here are some example questions and their corresponding SQL queries:\n\n"
    );
    for example in examples {
        prompt.push_str(&format!("-- Question: {}\n{}\n\n", example.question, example.sql));
    }
    prompt.push_str(&format!(
        "{INSTRUCTION}\n-- Question: {question}\n{PROMPT_OPENER}"
    ));
    prompt
}
