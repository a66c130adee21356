use crate::common::*;

/// The file name of the label list stored beside density map arrays.
pub const CLASS_INDEX_FILE: &str = "class_labels.json";

/// The mapping from artifact class index to class label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassIndex {
    pub class_labels: Vec<i64>,
}

impl ClassIndex {
    pub fn new(class_labels: Vec<i64>) -> Self {
        Self { class_labels }
    }

    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(CLASS_INDEX_FILE);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let index = serde_json::from_str(&text)?;
        Ok(index)
    }

    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let path = dir.as_ref().join(CLASS_INDEX_FILE);
        let text = serde_json::to_string_pretty(self)?;
        fs::write(&path, text).with_context(|| format!("failed to write '{}'", path.display()))?;
        Ok(())
    }

    /// Get the artifact index of a class label.
    pub fn index_of(&self, label: i64) -> Option<usize> {
        self.class_labels.iter().position(|&other| other == label)
    }
}

/// The density map file name of an image stem and class index.
pub fn density_file_name(stem: &str, class_index: usize) -> String {
    format!("{}_class_{}_density.npy", stem, class_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let index = ClassIndex::new(vec![3, 0, 7]);
        index.save(dir.path()).unwrap();
        let loaded = ClassIndex::open(dir.path()).unwrap();
        assert_eq!(loaded, index);
        assert_eq!(loaded.index_of(7), Some(2));
        assert_eq!(loaded.index_of(1), None);
    }

    #[test]
    fn artifact_naming() {
        assert_eq!(density_file_name("img_001", 0), "img_001_class_0_density.npy");
    }
}
