// Tests for the fragment cleaning rule and the append-only transcript
// buffer. Both are pure and synchronous, so no runtime is needed.

use habla::{clean_fragment, TranscriptAssembler};

#[test]
fn cleaning_removes_boilerplate_and_collapses_whitespace() {
    let input = "Subtítulos realizados por la comunidad de Amara.org  hola   mundo";
    assert_eq!(clean_fragment(input), "hola mundo");
}

#[test]
fn cleaning_is_case_insensitive() {
    let input = "SUBTÍTULOS REALIZADOS POR LA COMUNIDAD DE AMARA.ORG gracias";
    assert_eq!(clean_fragment(input), "gracias");

    let mid = "hola Subtítulos Realizados Por La Comunidad De Amara.Org mundo";
    assert_eq!(clean_fragment(mid), "hola mundo");
}

#[test]
fn cleaning_is_idempotent() {
    let inputs = [
        "Subtítulos realizados por la comunidad de Amara.org  hola   mundo",
        "  texto \t con \n espacios  ",
        "ya limpio",
        "",
    ];

    for input in inputs {
        let once = clean_fragment(input);
        let twice = clean_fragment(&once);
        assert_eq!(once, twice, "cleaning should be idempotent for {:?}", input);
    }
}

#[test]
fn cleaning_trims_and_collapses_runs() {
    assert_eq!(clean_fragment("  hola \t\n  mundo  "), "hola mundo");
    assert_eq!(clean_fragment("\n\n"), "");
}

#[test]
fn append_builds_transcript_in_order() {
    let mut assembler = TranscriptAssembler::new();

    assert!(assembler.append("primero"));
    assert!(assembler.append("segundo"));
    assert!(assembler.append("tercero"));

    assert_eq!(assembler.text(), "primero\nsegundo\ntercero\n");
    assert_eq!(assembler.fragment_count(), 3);
}

#[test]
fn append_is_prefix_extending() {
    let fragments = ["uno", "dos", "tres", "cuatro"];
    let mut assembler = TranscriptAssembler::new();
    let mut previous = String::new();

    for fragment in fragments {
        assembler.append(fragment);
        let current = assembler.text().to_string();
        assert!(
            current.starts_with(&previous),
            "transcript must only grow at the end"
        );
        assert!(current.len() > previous.len());
        previous = current;
    }
}

#[test]
fn append_discards_empty_and_whitespace_fragments() {
    let mut assembler = TranscriptAssembler::new();

    assert!(!assembler.append(""));
    assert!(!assembler.append("   \t\n"));
    assert!(assembler.is_empty());
    assert_eq!(assembler.fragment_count(), 0);
}

#[test]
fn append_discards_fragments_that_clean_to_empty() {
    let mut assembler = TranscriptAssembler::new();

    assert!(!assembler.append("Subtítulos realizados por la comunidad de Amara.org"));
    assert!(assembler.is_empty());
}

#[test]
fn append_cleans_each_fragment() {
    let mut assembler = TranscriptAssembler::new();

    assembler.append("  hola   mundo ");
    assembler.append("Subtítulos realizados por la comunidad de Amara.org adiós");

    assert_eq!(assembler.text(), "hola mundo\nadiós\n");
}

#[test]
fn clear_resets_for_a_new_session() {
    let mut assembler = TranscriptAssembler::new();
    assembler.append("algo");
    assert!(!assembler.is_empty());

    assembler.clear();
    assert!(assembler.is_empty());
    assert_eq!(assembler.fragment_count(), 0);
    assert_eq!(assembler.text(), "");
}
