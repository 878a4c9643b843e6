//! Render composition.
//!
//! Flows describe what they want drawn each frame with a [`Render`] value.
//! The app flattens it into a list of models and draws them with the scene
//! pipeline in the order they were returned.
//!
//! # Key types
//!
//! - [`Render<'a>`] is the enum flows return from `on_render`
//!

use crate::data_structures::model::Model;

/// Specifies what a flow wants rendered this frame.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Default(&Model)` renders a single model
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
pub enum Render<'a> {
    None,
    Default(&'a Model),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    /// Appends every model of the render tree to `models`, depth first.
    pub(crate) fn collect(self, models: &mut Vec<&'a Model>) {
        match self {
            Render::Default(model) => models.push(model),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.collect(models)),
            Render::None => (),
        }
    }
}

impl<'a> From<&'a Model> for Render<'a> {
    fn from(model: &'a Model) -> Self {
        Render::Default(model)
    }
}

impl<'a> From<Option<&'a Model>> for Render<'a> {
    fn from(model: Option<&'a Model>) -> Self {
        model.map_or(Render::None, Render::Default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_renders_collect_no_models() {
        let mut models = Vec::new();
        Render::Composed(vec![Render::None, Render::from(None)]).collect(&mut models);
        Render::Composed(vec![]).collect(&mut models);
        assert!(models.is_empty());
    }
}
