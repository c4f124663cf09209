use glam::IVec3;

/// One of 26 neighbor directions in a 3D grid (6 faces + 12 edges + 8 corners).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    // 6 face neighbors
    Down = 0,
    Up = 1,
    North = 2,
    South = 3,
    East = 4,
    West = 5,
    // 12 edge neighbors
    DownNorth = 6,
    DownSouth = 7,
    DownEast = 8,
    DownWest = 9,
    UpNorth = 10,
    UpSouth = 11,
    UpEast = 12,
    UpWest = 13,
    NorthEast = 14,
    NorthWest = 15,
    SouthEast = 16,
    SouthWest = 17,
    // 8 corner neighbors
    DownNorthEast = 18,
    DownNorthWest = 19,
    DownSouthEast = 20,
    DownSouthWest = 21,
    UpNorthEast = 22,
    UpNorthWest = 23,
    UpSouthEast = 24,
    UpSouthWest = 25,
}

/// All 26 directions.
pub const ALL_DIRECTIONS: [Direction; 26] = [
    Direction::Down,
    Direction::Up,
    Direction::North,
    Direction::South,
    Direction::East,
    Direction::West,
    Direction::DownNorth,
    Direction::DownSouth,
    Direction::DownEast,
    Direction::DownWest,
    Direction::UpNorth,
    Direction::UpSouth,
    Direction::UpEast,
    Direction::UpWest,
    Direction::NorthEast,
    Direction::NorthWest,
    Direction::SouthEast,
    Direction::SouthWest,
    Direction::DownNorthEast,
    Direction::DownNorthWest,
    Direction::DownSouthEast,
    Direction::DownSouthWest,
    Direction::UpNorthEast,
    Direction::UpNorthWest,
    Direction::UpSouthEast,
    Direction::UpSouthWest,
];

/// The 6 face directions, in the order used by face-adjacent fills.
pub const FACE_DIRECTIONS: [Direction; 6] = [
    Direction::Down,
    Direction::Up,
    Direction::North,
    Direction::South,
    Direction::East,
    Direction::West,
];

/// Neighbourhood used when deciding whether two cells touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Adjacency {
    /// Shared face only (6 neighbours).
    Face,
    /// Shared face, edge or corner (26 neighbours).
    Full,
}

impl Adjacency {
    /// Directions that count as touching under this adjacency.
    pub fn directions(self) -> &'static [Direction] {
        match self {
            Adjacency::Face => &FACE_DIRECTIONS,
            Adjacency::Full => &ALL_DIRECTIONS,
        }
    }

    /// Iterate the neighbour coordinates of `cell` under this adjacency.
    pub fn neighbors(self, cell: IVec3) -> impl Iterator<Item = IVec3> {
        self.directions().iter().map(move |dir| cell + dir.offset())
    }
}

impl Direction {
    /// Offset vector for this direction. Y-up convention: Down = (0,-1,0).
    pub fn offset(self) -> IVec3 {
        match self {
            // Faces
            Direction::Down => IVec3::new(0, -1, 0),
            Direction::Up => IVec3::new(0, 1, 0),
            Direction::North => IVec3::new(0, 0, -1),
            Direction::South => IVec3::new(0, 0, 1),
            Direction::East => IVec3::new(1, 0, 0),
            Direction::West => IVec3::new(-1, 0, 0),
            // Edges (down)
            Direction::DownNorth => IVec3::new(0, -1, -1),
            Direction::DownSouth => IVec3::new(0, -1, 1),
            Direction::DownEast => IVec3::new(1, -1, 0),
            Direction::DownWest => IVec3::new(-1, -1, 0),
            // Edges (up)
            Direction::UpNorth => IVec3::new(0, 1, -1),
            Direction::UpSouth => IVec3::new(0, 1, 1),
            Direction::UpEast => IVec3::new(1, 1, 0),
            Direction::UpWest => IVec3::new(-1, 1, 0),
            // Edges (lateral)
            Direction::NorthEast => IVec3::new(1, 0, -1),
            Direction::NorthWest => IVec3::new(-1, 0, -1),
            Direction::SouthEast => IVec3::new(1, 0, 1),
            Direction::SouthWest => IVec3::new(-1, 0, 1),
            // Corners (down)
            Direction::DownNorthEast => IVec3::new(1, -1, -1),
            Direction::DownNorthWest => IVec3::new(-1, -1, -1),
            Direction::DownSouthEast => IVec3::new(1, -1, 1),
            Direction::DownSouthWest => IVec3::new(-1, -1, 1),
            // Corners (up)
            Direction::UpNorthEast => IVec3::new(1, 1, -1),
            Direction::UpNorthWest => IVec3::new(-1, 1, -1),
            Direction::UpSouthEast => IVec3::new(1, 1, 1),
            Direction::UpSouthWest => IVec3::new(-1, 1, 1),
        }
    }

    /// Classification: face, edge, or corner.
    pub fn kind(self) -> DirectionKind {
        match self as u8 {
            0..=5 => DirectionKind::Face,
            6..=17 => DirectionKind::Edge,
            18..=25 => DirectionKind::Corner,
            _ => DirectionKind::Face, // unreachable
        }
    }
}

/// Classification of a direction by how many axes it moves along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionKind {
    Face,
    Edge,
    Corner,
}
