use super::*;

#[test]
fn facts_are_tagged_in_supplied_order() {
    let prompt = build_prompt(
        [(4, "A Drupert is meant to distract"), (0, "A Drupert is a fictional creature")],
        "Tell me about druperts",
    );

    let first = prompt
        .find("<fact_extract id='4'>A Drupert is meant to distract</fact_extract>")
        .expect("fact 4 is present");
    let second = prompt
        .find("<fact_extract id='0'>A Drupert is a fictional creature</fact_extract>")
        .expect("fact 0 is present");
    assert!(first < second, "facts must not be re-sorted by id");
}

#[test]
fn citation_instruction_is_present() {
    let prompt = build_prompt([(1, "fact")], "query");
    assert!(prompt.contains(CITATION_FORMAT));
    assert!(prompt.contains("Facts: [ids]"));
    assert!(prompt.contains("listed in ascending order"));
    assert!(prompt.starts_with("Give an answer using ONLY information"));
}

#[test]
fn user_question_comes_last() {
    let prompt = build_prompt([(0, "fact")], "Why is the sky blue?");
    assert!(prompt.ends_with("User question: {Why is the sky blue?}"));

    let facts_at = prompt.find(FACTS_HEADER).expect("facts header");
    let question_at = prompt.find("User question:").expect("question");
    assert!(facts_at < question_at);
}

#[test]
fn every_fact_appears_once() {
    let facts: Vec<(u64, String)> = (0..6).map(|id| (id, format!("fact number {id}"))).collect();
    let prompt = build_prompt(
        facts.iter().map(|(id, text)| (*id, text.as_str())),
        "query",
    );

    for (id, text) in &facts {
        let tag = format!("<fact_extract id='{id}'>{text}</fact_extract>");
        assert_eq!(prompt.matches(&tag).count(), 1);
    }
}

#[test]
fn no_facts_still_builds_a_prompt() {
    let prompt = build_prompt(std::iter::empty(), "query");
    assert!(prompt.contains(FACTS_HEADER));
    assert!(!prompt.contains("<fact_extract"));
    assert!(prompt.contains(CITATION_FORMAT));
}
