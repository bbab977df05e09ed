use docqa_core::traits::Generator;
use std::sync::Mutex;

use docqa_generate::{
    fit_token_budget, get_default_generator, grounded_prompt, lock_recovering, prompt_head, prompt_tail, split_prompt,
    FakeGenerator, MAX_INPUT_TOKENS, NOT_IN_CONTEXT,
};

#[test]
fn prompt_binds_the_model_to_the_context() {
    let p = grounded_prompt("What is the capital of France?", "The capital of France is Paris.");
    assert!(p.contains("ONLY the context"));
    assert!(p.contains("I don't know."));
    assert!(p.contains("Context:\nThe capital of France is Paris."));
    assert!(p.ends_with("Question: What is the capital of France?\nAnswer:"));
}

#[test]
fn split_prompt_recovers_question_and_context() {
    let context = "First chunk.\n\nSecond chunk.";
    let p = grounded_prompt("Which chunk?", context);
    assert_eq!(split_prompt(&p), Some(("Which chunk?", context)));
    assert_eq!(split_prompt("free-form prompt"), None);
}

#[test]
fn fake_generator_extracts_the_best_sentence() {
    let g = FakeGenerator;
    let context = "Bananas are yellow.\n\nThe capital of France is Paris. Berlin is in Germany.";
    let out = g.generate(&grounded_prompt("What is the capital of France?", context), 256).unwrap();
    assert_eq!(out, "The capital of France is Paris.");
}

#[test]
fn fake_generator_says_it_does_not_know() {
    let g = FakeGenerator;
    let out = g.generate(&grounded_prompt("Who wrote Hamlet?", "Bananas are yellow."), 256).unwrap();
    assert_eq!(out, NOT_IN_CONTEXT);
}

#[test]
fn fake_generator_is_deterministic_and_respects_max_tokens() {
    let g = FakeGenerator;
    let p = grounded_prompt("capital France", "The capital of France is Paris.");
    assert_eq!(g.generate(&p, 256).unwrap(), g.generate(&p, 256).unwrap());
    assert_eq!(g.generate(&p, 3).unwrap(), "The capital of");
}

#[test]
fn env_switch_selects_fake_generator() {
    std::env::set_var("APP_USE_FAKE_GENERATION", "1");
    let g = get_default_generator(None).expect("generator");
    let out = g.generate(&grounded_prompt("capital of France?", "The capital of France is Paris."), 64).unwrap();
    assert!(out.contains("Paris"));
}

#[test]
fn prompt_parts_rebuild_the_prompt() {
    let p = grounded_prompt("Why?", "Because.");
    assert_eq!(p, format!("{}Because.{}", prompt_head(), prompt_tail("Why?")));
}

#[test]
fn oversized_context_is_trimmed_but_question_survives() {
    const EOS: u32 = 1;
    let head = vec![10u32; 40];
    let context: Vec<u32> = (100..100 + 3 * MAX_INPUT_TOKENS as u32).collect();
    let tail = vec![20u32, 21, 22, 23];
    let ids = fit_token_budget(&head, &context, &tail, EOS, MAX_INPUT_TOKENS);

    assert_eq!(ids.len(), MAX_INPUT_TOKENS);
    assert_eq!(&ids[..head.len()], head.as_slice());
    assert_eq!(&ids[ids.len() - tail.len() - 1..ids.len() - 1], tail.as_slice());
    assert_eq!(*ids.last().unwrap(), EOS);
    // the start of the context is what remains
    assert_eq!(ids[head.len()], 100);
}

#[test]
fn context_within_budget_is_kept_whole() {
    let ids = fit_token_budget(&[7, 7], &[1, 2, 3], &[9], 0, 16);
    assert_eq!(ids, vec![7, 7, 1, 2, 3, 9, 0]);
}

#[test]
fn head_and_tail_are_kept_even_past_the_budget() {
    let ids = fit_token_budget(&[7; 5], &[1, 2, 3], &[9; 5], 0, 4);
    assert_eq!(ids, [vec![7; 5], vec![9; 5], vec![0]].concat());
}

#[test]
fn poisoned_lock_is_recovered() {
    let m = std::sync::Arc::new(Mutex::new(0u32));
    let m2 = std::sync::Arc::clone(&m);
    let _ = std::thread::spawn(move || {
        let _g = m2.lock().unwrap();
        panic!("boom while holding the lock");
    })
    .join();
    assert!(m.is_poisoned());
    *lock_recovering(&m) += 1;
    assert_eq!(*lock_recovering(&m), 1);
}
