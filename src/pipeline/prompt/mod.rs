#[cfg(test)]
mod tests;

use itertools::Itertools;

/// Trailing citation format the model is asked to follow
pub const CITATION_FORMAT: &str = "Facts: [ids]";

const INSTRUCTIONS: &str = "\
Give an answer using ONLY information from the following product manual extracts.
If the product manual doesn't contain the information, you should say so.
Do not make up information beyond what is given.
Whenever relevant, specify fact_extract id to cite the factual extract that your answer is based on.
Please include the fact_extract ids that were used to generate this story, at the end of the story.
The format of this fact_extract ids must be, and they must be listed in ascending order:";

const FACTS_HEADER: &str = "These are the facts about druperts:";

/// Build the grounded prompt for `user_query`.
///
/// Facts keep the order they are given in (retrieval rank), each wrapped in a
/// `<fact_extract id='..'>` tag. Only the model's citation list is asked to be sorted.
#[inline]
pub fn build_prompt<'a, I>(facts: I, user_query: &str) -> String
where
    I: IntoIterator<Item = (u64, &'a str)>,
{
    let facts = facts
        .into_iter()
        .map(|(id, text)| format!("<fact_extract id='{id}'>{text}</fact_extract>"))
        .join("\n");

    format!(
        "{INSTRUCTIONS}\n\n   {CITATION_FORMAT}\n\n{FACTS_HEADER}\n{facts}\n\nUser question: {{{user_query}}}"
    )
}
