/// Controls how a [`VectorTile`](crate::VectorTile) is laid out when encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    sort_features_by_type: bool,
    infer_shapes: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            sort_features_by_type: true,
            infer_shapes: true,
        }
    }
}

impl WriteOptions {
    /// Group the features of each layer by type, keeping their relative order otherwise.
    pub fn with_sort_features_by_type(mut self, sort: bool) -> Self {
        self.sort_features_by_type = sort;
        self
    }

    /// Infer the shape of layers that do not declare one. When disabled, such layers fail to
    /// encode.
    pub fn with_infer_shapes(mut self, infer: bool) -> Self {
        self.infer_shapes = infer;
        self
    }

    pub fn sort_features_by_type(&self) -> bool {
        self.sort_features_by_type
    }

    pub fn infer_shapes(&self) -> bool {
        self.infer_shapes
    }
}
