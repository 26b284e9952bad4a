/// A line exactly equal to this ends one stage block and starts the next.
pub const STAGE_SEPARATOR: &str = "---";

/// Hard limit on stages per file; one channel buffer exists per stage slot.
pub const MAX_STAGES: usize = 4;

/// One `---`-delimited block of the shader file.
#[derive(Debug, Clone, PartialEq)]
pub struct StageBlock {
    pub index: usize,
    /// 1-based line in the file where the block's first line sits.
    pub first_line: usize,
    pub source: String,
}

/// Split file content into at most `limit` (and never more than
/// [`MAX_STAGES`]) stage blocks. Blank blocks are not emitted.
pub fn split_stages(content: &str, limit: usize) -> Vec<StageBlock> {
    let limit = limit.clamp(1, MAX_STAGES);
    let mut stages = Vec::new();
    let mut current = String::new();
    let mut first_line = 1;

    for (i, line) in content.lines().enumerate() {
        let line_no = i + 1;
        if line == STAGE_SEPARATOR {
            finish(&mut stages, &mut current, first_line);
            if stages.len() == limit {
                return stages;
            }
            first_line = line_no + 1;
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }

    finish(&mut stages, &mut current, first_line);
    stages
}

fn finish(stages: &mut Vec<StageBlock>, current: &mut String, first_line: usize) {
    let source = std::mem::take(current);
    if source.trim().is_empty() {
        if !source.is_empty() {
            log::debug!("Skipping blank stage block at line {first_line}");
        }
        return;
    }
    stages.push(StageBlock {
        index: stages.len(),
        first_line,
        source,
    });
}
