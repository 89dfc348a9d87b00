use crate::time::TimeInternal;

#[derive(Default, Copy, Clone, Debug, Eq, PartialEq)]
pub struct CurrentDS {
    pub steps_removed: u16,
    pub offset_from_master: TimeInternal,
    pub mean_path_delay: TimeInternal,
}
