use crate::blend::{Blend, BlendMode};
use crate::chunky::ChunkyImage;
use crate::util::VecI;

pub type MemberID = crate::id::Id<StructureMember>;

#[derive(
    strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize,
)]
pub enum MemberKind {
    Folder,
    Layer,
}

/// Which raster of a member an edit targets.
#[derive(
    strum::AsRefStr,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum ImageTarget {
    /// A layer's pixels.
    #[default]
    Content,
    /// The member's mask, of either kind.
    Mask,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Mask {
    pub image: ChunkyImage,
    pub visible: bool,
}

#[derive(Clone, PartialEq, Debug)]
pub enum MemberContent {
    /// Children in compositing order, index 0 is bottom-most.
    Folder { children: Vec<MemberID> },
    Layer { image: ChunkyImage },
}

/// One settable attribute of a member along with its value.
#[derive(strum::AsRefStr, Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
pub enum PropertyValue {
    Name(String),
    Visibility(bool),
    Opacity(f32),
    BlendMode(BlendMode),
    ClipToMemberBelow(bool),
    MaskVisibility(bool),
}
impl PropertyValue {
    /// Whether changing this property can alter rendered pixels.
    #[must_use]
    pub fn affects_raster(&self) -> bool {
        !matches!(self, Self::Name(_))
    }
}

/// A Folder or Layer node of the document.
#[derive(Clone, PartialEq, Debug)]
pub struct StructureMember {
    id: MemberID,
    pub name: String,
    pub visible: bool,
    pub blend: Blend,
    pub mask: Option<Mask>,
    content: MemberContent,
}
impl StructureMember {
    /// A new, empty member. Layers get a blank image over `canvas`.
    #[must_use]
    pub fn new(id: MemberID, kind: MemberKind, name: String, canvas: VecI) -> Self {
        let content = match kind {
            MemberKind::Folder => MemberContent::Folder {
                children: Vec::new(),
            },
            MemberKind::Layer => MemberContent::Layer {
                image: ChunkyImage::new(canvas),
            },
        };
        Self {
            id,
            name,
            visible: true,
            blend: Blend::default(),
            mask: None,
            content,
        }
    }
    #[must_use]
    pub fn id(&self) -> MemberID {
        self.id
    }
    pub(super) fn set_id(&mut self, id: MemberID) {
        self.id = id;
    }
    #[must_use]
    pub fn kind(&self) -> MemberKind {
        match self.content {
            MemberContent::Folder { .. } => MemberKind::Folder,
            MemberContent::Layer { .. } => MemberKind::Layer,
        }
    }
    #[must_use]
    pub fn content(&self) -> &MemberContent {
        &self.content
    }
    /// Children, bottom-most first. Always empty for layers.
    #[must_use]
    pub fn children(&self) -> &[MemberID] {
        match &self.content {
            MemberContent::Folder { children } => children,
            MemberContent::Layer { .. } => &[],
        }
    }
    pub(super) fn children_mut(&mut self) -> Option<&mut Vec<MemberID>> {
        match &mut self.content {
            MemberContent::Folder { children } => Some(children),
            MemberContent::Layer { .. } => None,
        }
    }
    #[must_use]
    pub fn image(&self, target: ImageTarget) -> Option<&ChunkyImage> {
        match (target, &self.content) {
            (ImageTarget::Content, MemberContent::Layer { image }) => Some(image),
            (ImageTarget::Content, MemberContent::Folder { .. }) => None,
            (ImageTarget::Mask, _) => self.mask.as_ref().map(|mask| &mask.image),
        }
    }
    pub fn image_mut(&mut self, target: ImageTarget) -> Option<&mut ChunkyImage> {
        match (target, &mut self.content) {
            (ImageTarget::Content, MemberContent::Layer { image }) => Some(image),
            (ImageTarget::Content, MemberContent::Folder { .. }) => None,
            (ImageTarget::Mask, _) => self.mask.as_mut().map(|mask| &mut mask.image),
        }
    }
    /// Every raster owned directly by this member.
    pub fn images(&self) -> impl Iterator<Item = (ImageTarget, &ChunkyImage)> + '_ {
        [ImageTarget::Content, ImageTarget::Mask]
            .into_iter()
            .filter_map(|target| self.image(target).map(|image| (target, image)))
    }
    /// Current value of the same property as `like`.
    #[must_use]
    pub fn property(&self, like: &PropertyValue) -> Option<PropertyValue> {
        Some(match like {
            PropertyValue::Name(_) => PropertyValue::Name(self.name.clone()),
            PropertyValue::Visibility(_) => PropertyValue::Visibility(self.visible),
            PropertyValue::Opacity(_) => PropertyValue::Opacity(self.blend.opacity),
            PropertyValue::BlendMode(_) => PropertyValue::BlendMode(self.blend.mode),
            PropertyValue::ClipToMemberBelow(_) => {
                PropertyValue::ClipToMemberBelow(self.blend.alpha_clip)
            }
            PropertyValue::MaskVisibility(_) => {
                PropertyValue::MaskVisibility(self.mask.as_ref()?.visible)
            }
        })
    }
}
