use anyhow::Result;
use test_utils::codeblock_fixture;

use super::CodeBlocks;
use crate::domain::models::AppError;
use crate::domain::services::ContentParser;

fn from_fixture() -> CodeBlocks {
    return CodeBlocks::from_segments(&ContentParser::parse(codeblock_fixture()));
}

#[test]
fn it_collects_code_segments() {
    let codeblocks = from_fixture();
    assert_eq!(codeblocks.codeblocks.len(), 4);
    assert!(!codeblocks.is_empty());
}

#[test]
fn it_provides_first_codeblock() -> Result<()> {
    let res = from_fixture().select("1")?;
    insta::assert_snapshot!(res, @r###"
    fn print_numbers() {
        for i in 0..=0 {
            println!("{i}");
        }
    }
    "###);
    return Ok(());
}

#[test]
fn it_provides_last_codeblock() -> Result<()> {
    let res = from_fixture().select("")?;
    insta::assert_snapshot!(res, @r###"
    for i in range(11):
        print(i)
    "###);
    return Ok(());
}

#[test]
fn it_provides_a_list_of_codeblocks() -> Result<()> {
    let res = from_fixture().select("3, 4")?;
    insta::assert_snapshot!(res, @r###"
    abc123

    for i in range(11):
        print(i)
    "###);
    return Ok(());
}

#[test]
fn it_provides_an_inclusive_range_of_codeblocks() -> Result<()> {
    let res = from_fixture().select("3..4")?;
    assert_eq!(res, from_fixture().select("3,4")?);
    return Ok(());
}

#[test]
fn it_fails_on_out_of_range_blocks() {
    for selection in ["5", "0", "2..9", "abc", "3..1", "1..18446744073709551615"] {
        let res = from_fixture().select(selection);
        assert!(matches!(res, Err(AppError::InvalidInput(_))), "{selection}");
    }
}

#[test]
fn it_fails_when_there_are_no_blocks() {
    let codeblocks = CodeBlocks::from_segments(&ContentParser::parse("Just prose."));
    assert!(codeblocks.is_empty());
    assert!(matches!(codeblocks.select(""), Err(AppError::InvalidInput(_))));
}
