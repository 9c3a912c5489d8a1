use std::borrow::Cow;

use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Moves backwards in a file to beginning of a previous line.
pub async fn seek_line_backwards(
    file: &mut (impl AsyncSeek + AsyncRead + Unpin),
    buffer: &mut [u8],
) -> Result<(), io::Error> {
    // We skip first new line that is right before the buffer, so that reading doesn't get stuck.
    // For example: need_to_read_this\nwe_are_here_now\n
    let mut need_to_skip = 1usize;
    loop {
        let leftover = file.stream_position().await?;
        if leftover == 0 {
            return Ok(());
        }
        let next_chunk = u64::min(leftover, buffer.len() as u64) as usize;
        file.seek(std::io::SeekFrom::Current(-(next_chunk as i64)))
            .await?;

        file.read_exact(&mut buffer[..next_chunk]).await?;
        let iter = buffer[..next_chunk].iter().rev().enumerate();
        let iter = iter.skip(need_to_skip);
        for (index, value) in iter {
            if *value == b'\n' {
                file.seek(std::io::SeekFrom::Current(-(index as i64)))
                    .await?;
                return Ok(());
            }
        }

        need_to_skip = need_to_skip.saturating_sub(1);
        file.seek(std::io::SeekFrom::Current(-(next_chunk as i64)))
            .await?;
    }
}

/// Walks the file from the end and passes every non-empty line to `parse` until `limit` lines
/// were accepted or the file is exhausted. Lines `parse` rejects don't count towards `limit`.
/// Results are returned last line first.
pub async fn read_lines_backwards<T>(
    file: &mut (impl AsyncSeek + AsyncRead + Unpin),
    limit: usize,
    mut parse: impl FnMut(&str) -> Option<T>,
) -> Result<Vec<T>, io::Error> {
    let mut buffer = vec![0; 1024];
    let mut accepted = Vec::new();
    let mut line_end = file.seek(std::io::SeekFrom::End(0)).await?;

    while accepted.len() < limit && line_end > 0 {
        seek_line_backwards(file, &mut buffer).await?;
        let line_start = file.stream_position().await?;

        let mut raw = vec![0; (line_end - line_start) as usize];
        file.read_exact(&mut raw).await?;
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end_matches(['\n', '\r']);
        if !line.is_empty() {
            accepted.extend(parse(line));
        }

        file.seek(std::io::SeekFrom::Start(line_start)).await?;
        line_end = line_start;
    }

    Ok(accepted)
}

/// Splits raw file content into non-empty lines. Invalid UTF-8 is replaced instead of failing,
/// so a single damaged line can't make the rest of the file unreadable.
pub fn lossy_lines(content: &[u8]) -> impl Iterator<Item = Cow<'_, str>> {
    content
        .split(|byte| *byte == b'\n')
        .map(|line| line.strip_suffix(b"\r".as_slice()).unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(String::from_utf8_lossy)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;

    use tempfile::tempfile;
    use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

    use crate::fs::operations::{lossy_lines, read_lines_backwards, seek_line_backwards};

    const CONTENT: &str = "first session\n\
                           second session\n\
                           third session";

    #[tokio::test]
    async fn test_seek_line_backwards_basic() -> Result<()> {
        let mut file = tempfile()?;
        file.write_all(CONTENT.as_bytes())?;

        let mut file = tokio::fs::File::from_std(file);

        for _ in 0..3 {
            seek_line_backwards(&mut file, vec![0; 1024].as_mut_slice()).await?;
        }

        assert_eq!(file.stream_position().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_seek_line_backwards_small_buffer() -> Result<()> {
        let mut file = tempfile()?;
        let positions = CONTENT
            .bytes()
            .enumerate()
            .filter(|v| v.1 == b'\n')
            .map(|v| v.0 + 1)
            .collect::<Vec<_>>();

        file.write_all(CONTENT.as_bytes())?;

        let mut file = BufReader::new(tokio::fs::File::from_std(file));
        file.seek(std::io::SeekFrom::Start(0)).await?;

        file.read_line(&mut String::new()).await?;
        file.read_line(&mut String::new()).await?;
        file.read_line(&mut String::new()).await?;

        seek_line_backwards(&mut file, vec![0; 2].as_mut_slice()).await?;
        assert_eq!(file.stream_position().await?, positions[1] as u64);

        seek_line_backwards(&mut file, vec![0; 2].as_mut_slice()).await?;
        assert_eq!(file.stream_position().await?, positions[0] as u64);

        Ok(())
    }

    fn keep(line: &str) -> Option<String> {
        Some(line.to_string())
    }

    #[tokio::test]
    async fn test_read_lines_backwards() -> Result<()> {
        let mut file = tempfile()?;
        file.write_all(CONTENT.as_bytes())?;
        file.write_all(b"\n\nfourth session\n")?;
        let mut file = tokio::fs::File::from_std(file);

        let lines = read_lines_backwards(&mut file, 3, keep).await?;
        assert_eq!(
            lines,
            vec!["fourth session", "third session", "second session"]
        );

        let lines = read_lines_backwards(&mut file, 10, keep).await?;
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], "first session");
        Ok(())
    }

    #[tokio::test]
    async fn test_read_lines_backwards_rejected_lines_not_counted() -> Result<()> {
        let mut file = tempfile()?;
        file.write_all(b"first session\nbroken\nsecond session\nbroken\nthird session\n")?;
        let mut file = tokio::fs::File::from_std(file);

        let lines = read_lines_backwards(&mut file, 3, |line| {
            (line != "broken").then(|| line.to_string())
        })
        .await?;
        assert_eq!(
            lines,
            vec!["third session", "second session", "first session"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_read_lines_backwards_empty() -> Result<()> {
        let mut file = tokio::fs::File::from_std(tempfile()?);
        assert!(read_lines_backwards(&mut file, 5, keep).await?.is_empty());
        Ok(())
    }

    #[test]
    fn test_lossy_lines_survive_invalid_utf8() {
        let content = b"first\r\n\n\xd1\nthird\n";
        let lines = lossy_lines(content).collect::<Vec<_>>();
        assert_eq!(lines, vec!["first", "\u{FFFD}", "third"]);
    }
}
