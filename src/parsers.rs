use nom::{
    IResult, Parser,
    bytes::complete::{take, take_till},
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map_res, opt, verify},
    multi::{many_till, many0},
    number::complete::{le_u16, le_u32},
    sequence::{preceded, separated_pair},
};

/// Size of the fixed Shell Link header, also the value of its first field
const SHELL_LINK_HEADER_SIZE: u32 = 0x4C;

// LinkFlags
const HAS_LINK_TARGET_ID_LIST: u32 = 0x01;
const HAS_LINK_INFO: u32 = 0x02;
const HAS_NAME: u32 = 0x04;
const HAS_RELATIVE_PATH: u32 = 0x08;
const HAS_WORKING_DIR: u32 = 0x10;
const IS_UNICODE: u32 = 0x80;

// LinkInfoFlags
const VOLUME_ID_AND_LOCAL_BASE_PATH: u32 = 0x01;

/// LinkInfo headers of at least this size carry offsets to Unicode paths
const LINK_INFO_UNICODE_HEADER_SIZE: u32 = 0x24;

fn parse_u32(input: &str) -> IResult<&str, u32> {
    map_res(digit1, |digits: &str| digits.parse::<u32>()).parse(input)
}

/// Parses a screen resolution such as `1920x1080` (case-insensitive separator)
pub fn parse_resolution(input: &str) -> IResult<&str, (u32, u32)> {
    all_consuming(separated_pair(parse_u32, one_of("xX"), parse_u32)).parse(input)
}

fn parse_version(input: &str) -> IResult<&str, (Option<char>, &str, Vec<&str>)> {
    (
        opt(one_of("vV")),
        digit1,
        many0(preceded(char('.'), digit1)),
    )
        .parse(input)
}

/// Returns true for words which look like version numbers, e.g. `v2`, `v1.2` or `1.0.3`
///
/// Plain integers are not treated as versions, as they are commonly part of a title.
pub fn is_version_token(word: &str) -> bool {
    all_consuming(parse_version)
        .parse(word)
        .is_ok_and(|(_, (prefix, _, parts))| prefix.is_some() || !parts.is_empty())
}

fn u16_le(input: &[u8]) -> IResult<&[u8], u16> {
    le_u16(input)
}

fn u32_le(input: &[u8]) -> IResult<&[u8], u32> {
    le_u32(input)
}

fn take_bytes(input: &[u8], count: usize) -> IResult<&[u8], &[u8]> {
    take(count).parse(input)
}

fn nul_terminated(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_till(|byte: u8| byte == 0).parse(input)
}

fn nul_terminated_utf16(input: &[u8]) -> IResult<&[u8], String> {
    let (input, (units, _)) =
        many_till(u16_le, verify(u16_le, |unit: &u16| *unit == 0)).parse(input)?;

    Ok((input, String::from_utf16_lossy(&units)))
}

fn string_at(block: &[u8], offset: u32, unicode: bool) -> IResult<&[u8], String> {
    let (input, _) = take_bytes(block, offset as usize)?;

    if unicode {
        nul_terminated_utf16(input)
    } else {
        let (input, bytes) = nul_terminated(input)?;
        Ok((input, String::from_utf8_lossy(bytes).into_owned()))
    }
}

/// Data which matters for finding the target of a `.lnk` file
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ShellLink {
    pub local_base_path: Option<String>,
    pub common_path_suffix: Option<String>,
    pub name: Option<String>,
    pub relative_path: Option<String>,
    pub working_dir: Option<String>,
}

impl ShellLink {
    /// Absolute target path, if the link carries one
    pub fn absolute_target(&self) -> Option<String> {
        let base = self.local_base_path.as_deref().filter(|b| !b.is_empty())?;
        let suffix = self.common_path_suffix.as_deref().unwrap_or_default();

        Some(format!("{base}{suffix}"))
    }
}

#[tracing::instrument(level = "trace", skip(block))]
fn parse_link_info(block: &[u8]) -> IResult<&[u8], (Option<String>, Option<String>)> {
    let (input, _size) = u32_le(block)?;
    let (input, header_size) = u32_le(input)?;
    let (input, flags) = u32_le(input)?;
    let (input, _volume_id_offset) = u32_le(input)?;
    let (input, local_base_path_offset) = u32_le(input)?;
    let (input, _network_relative_link_offset) = u32_le(input)?;
    let (input, common_path_suffix_offset) = u32_le(input)?;

    if flags & VOLUME_ID_AND_LOCAL_BASE_PATH == 0 {
        return Ok((input, (None, None)));
    }

    if header_size >= LINK_INFO_UNICODE_HEADER_SIZE {
        let (input, local_base_path_offset) = u32_le(input)?;
        let (input, common_path_suffix_offset) = u32_le(input)?;
        let (_, local_base_path) = string_at(block, local_base_path_offset, true)?;
        let (_, common_path_suffix) = string_at(block, common_path_suffix_offset, true)?;

        return Ok((input, (Some(local_base_path), Some(common_path_suffix))));
    }

    let (_, local_base_path) = string_at(block, local_base_path_offset, false)?;
    let (_, common_path_suffix) = string_at(block, common_path_suffix_offset, false)?;

    Ok((input, (Some(local_base_path), Some(common_path_suffix))))
}

fn parse_string_data(input: &[u8], unicode: bool) -> IResult<&[u8], String> {
    let (input, count) = u16_le(input)?;

    if unicode {
        let (input, bytes) = take_bytes(input, usize::from(count) * 2)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok((input, String::from_utf16_lossy(&units)))
    } else {
        let (input, bytes) = take_bytes(input, usize::from(count))?;
        Ok((input, String::from_utf8_lossy(bytes).into_owned()))
    }
}

/// Parses the binary Shell Link (`.lnk`) format far enough to locate the link's target
#[tracing::instrument(level = "trace", skip(input))]
pub fn parse_shell_link(input: &[u8]) -> IResult<&[u8], ShellLink> {
    let (input, _) = verify(u32_le, |size: &u32| *size == SHELL_LINK_HEADER_SIZE).parse(input)?;
    let (input, _class_id) = take_bytes(input, 16)?;
    let (input, flags) = u32_le(input)?;
    // Remaining header fields: attributes, timestamps, file size, icon, show command and hot key
    let (mut input, _) = take_bytes(input, SHELL_LINK_HEADER_SIZE as usize - 24)?;

    if flags & HAS_LINK_TARGET_ID_LIST != 0 {
        let (rest, id_list_size) = u16_le(input)?;
        (input, _) = take_bytes(rest, usize::from(id_list_size))?;
    }

    let mut link = ShellLink::default();

    if flags & HAS_LINK_INFO != 0 {
        let (_, link_info_size) = u32_le(input)?;
        let (rest, block) = take_bytes(input, link_info_size as usize)?;
        let (_, (local_base_path, common_path_suffix)) = parse_link_info(block)?;

        link.local_base_path = local_base_path;
        link.common_path_suffix = common_path_suffix;
        input = rest;
    }

    let unicode = flags & IS_UNICODE != 0;
    if flags & HAS_NAME != 0 {
        let (rest, name) = parse_string_data(input, unicode)?;
        link.name = Some(name);
        input = rest;
    }
    if flags & HAS_RELATIVE_PATH != 0 {
        let (rest, relative_path) = parse_string_data(input, unicode)?;
        link.relative_path = Some(relative_path);
        input = rest;
    }
    if flags & HAS_WORKING_DIR != 0 {
        let (rest, working_dir) = parse_string_data(input, unicode)?;
        link.working_dir = Some(working_dir);
        input = rest;
    }

    Ok((input, link))
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::{test_utils::*, *};

    #[test_case("1920x1080", Some((1920, 1080)))]
    #[test_case("1280X720", Some((1280, 720)))]
    #[test_case("1920", None)]
    #[test_case("x1080", None)]
    #[test_case("1920x1080p", None)]
    #[test_case("axb", None)]
    fn test_parse_resolution(input: &str, expected: Option<(u32, u32)>) {
        assert_eq!(parse_resolution(input).ok().map(|(_, res)| res), expected);
    }

    #[test_case("v1", true)]
    #[test_case("V1.2", true)]
    #[test_case("1.0.3", true)]
    #[test_case("2", false)]
    #[test_case("2048", false)]
    #[test_case("v", false)]
    #[test_case("version", false)]
    #[test_case("1.", false)]
    fn test_is_version_token(word: &str, expected: bool) {
        assert_eq!(is_version_token(word), expected);
    }

    #[test_case(false; "ansi")]
    #[test_case(true; "unicode")]
    fn test_parse_shell_link_absolute(unicode: bool) {
        let bytes = build_absolute_link("C:\\Games\\Super Game\\SuperGame.exe", unicode);
        let (_, link) = parse_shell_link(&bytes).unwrap();

        assert_eq!(
            link.absolute_target().as_deref(),
            Some("C:\\Games\\Super Game\\SuperGame.exe")
        );
        assert_eq!(link.relative_path, None);
    }

    #[test]
    fn test_parse_shell_link_relative() {
        let bytes = build_relative_link(".\\Super Game\\SuperGame.exe");
        let (_, link) = parse_shell_link(&bytes).unwrap();

        assert_eq!(link.absolute_target(), None);
        assert_eq!(link.name.as_deref(), Some("A game"));
        assert_eq!(
            link.relative_path.as_deref(),
            Some(".\\Super Game\\SuperGame.exe")
        );
    }

    #[test]
    fn test_parse_shell_link_rejects_garbage() {
        assert!(parse_shell_link(b"not a shortcut at all").is_err());
        assert!(parse_shell_link(&[]).is_err());

        let mut truncated = build_absolute_link("C:\\Game.exe", false);
        truncated.truncate(90);
        assert!(parse_shell_link(&truncated).is_err());
    }
}
