use std::path::{Path, PathBuf};

pub fn out_deck(work_dir: impl AsRef<Path>, name: &str, extension: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{name}.{extension}"))
}

pub fn out_expectations(work_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{name}.expect.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names() {
        assert_eq!(
            out_deck("/tmp/build", "sram_4_16_scn4m_subm", "sp"),
            PathBuf::from("/tmp/build/sram_4_16_scn4m_subm.sp")
        );
        assert_eq!(
            out_expectations("build", "sram"),
            PathBuf::from("build/sram.expect.json")
        );
    }
}
