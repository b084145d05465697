use bitflags::bitflags;

bitflags! {
    /// Flags for nodes in the TVFS path table.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PathTableNodeFlags: u32 {
        /// A separator goes before the node's name.
        const PATH_SEPARATOR_PRE = 0x0001;
        /// A separator goes after the node's name.
        const PATH_SEPARATOR_POST = 0x0002;
        /// The node carries a folder size or file offset.
        const IS_NODE_VALUE = 0x0004;
    }
}
