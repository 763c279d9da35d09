use crossterm::event::KeyCode;
use rand::Rng;

// ============================================================================
// Configuration
// ============================================================================

pub const DEFAULT_ROWS: i16 = 10;
pub const DEFAULT_ROUND_SECS: u32 = 30;
pub const POWER_UP_SPAWN_SECS: u64 = 5;
pub const START_SCORE: u32 = 1;

#[derive(Clone, Copy, Debug)]
pub struct GameConfig {
    pub rows: i16,
    pub round_secs: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            round_secs: DEFAULT_ROUND_SECS,
        }
    }
}

// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Coordinates {
    pub x: i16,
    pub y: i16,
}

impl Coordinates {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PlayerId(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn delta(self) -> (i16, i16) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// Key codes a player answers to. Any other key is ignored by that player.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct KeyBindings {
    pub up: KeyCode,
    pub down: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
}

impl KeyBindings {
    pub fn arrows() -> Self {
        Self {
            up: KeyCode::Up,
            down: KeyCode::Down,
            left: KeyCode::Left,
            right: KeyCode::Right,
        }
    }

    pub fn wasd() -> Self {
        Self {
            up: KeyCode::Char('w'),
            down: KeyCode::Char('s'),
            left: KeyCode::Char('a'),
            right: KeyCode::Char('d'),
        }
    }

    pub fn direction_for(&self, key: KeyCode) -> Option<Direction> {
        if key == self.up {
            Some(Direction::Up)
        } else if key == self.down {
            Some(Direction::Down)
        } else if key == self.left {
            Some(Direction::Left)
        } else if key == self.right {
            Some(Direction::Right)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerColor {
    Pink,
    Green,
}

impl PlayerColor {
    pub fn label(self) -> &'static str {
        match self {
            PlayerColor::Pink => "pink",
            PlayerColor::Green => "green",
        }
    }
}

// ============================================================================
// Power-ups
// ============================================================================

/// The fixed catalog: four claim variants and four clear variants, one per
/// geometry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PowerUp {
    ClaimZone,
    ClaimRowAndColumn,
    ClaimCross,
    ClaimLine,
    ExplodeZone,
    ExplodeRowAndColumn,
    ExplodeCross,
    ExplodeLine,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Effect {
    Claim,
    Clear,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Geometry {
    Zone,
    RowAndColumn,
    Cross,
    Line,
}

impl PowerUp {
    pub const ALL: [PowerUp; 8] = [
        PowerUp::ClaimZone,
        PowerUp::ClaimRowAndColumn,
        PowerUp::ClaimCross,
        PowerUp::ClaimLine,
        PowerUp::ExplodeZone,
        PowerUp::ExplodeRowAndColumn,
        PowerUp::ExplodeCross,
        PowerUp::ExplodeLine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PowerUp::ClaimZone => "claim-zone",
            PowerUp::ClaimRowAndColumn => "claim-row-and-column",
            PowerUp::ClaimCross => "claim-cross",
            PowerUp::ClaimLine => "claim-line",
            PowerUp::ExplodeZone => "explode-zone",
            PowerUp::ExplodeRowAndColumn => "explode-row-and-column",
            PowerUp::ExplodeCross => "explode-cross",
            PowerUp::ExplodeLine => "explode-line",
        }
    }

    /// Two-column glyph used by the terminal front-end.
    pub fn icon(self) -> &'static str {
        match self.geometry() {
            Geometry::Zone => "()",
            Geometry::RowAndColumn => "##",
            Geometry::Cross => "++",
            Geometry::Line => "--",
        }
    }

    pub fn effect(self) -> Effect {
        match self {
            PowerUp::ClaimZone
            | PowerUp::ClaimRowAndColumn
            | PowerUp::ClaimCross
            | PowerUp::ClaimLine => Effect::Claim,
            PowerUp::ExplodeZone
            | PowerUp::ExplodeRowAndColumn
            | PowerUp::ExplodeCross
            | PowerUp::ExplodeLine => Effect::Clear,
        }
    }

    pub fn geometry(self) -> Geometry {
        match self {
            PowerUp::ClaimZone | PowerUp::ExplodeZone => Geometry::Zone,
            PowerUp::ClaimRowAndColumn | PowerUp::ExplodeRowAndColumn => Geometry::RowAndColumn,
            PowerUp::ClaimCross | PowerUp::ExplodeCross => Geometry::Cross,
            PowerUp::ClaimLine | PowerUp::ExplodeLine => Geometry::Line,
        }
    }
}

// ============================================================================
// Random Source Trait
// ============================================================================

pub trait RandomSource {
    /// Uniform pick of an index in `0..len`. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize;
}

struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn pick_index(&mut self, len: usize) -> usize {
        let mut rng = rand::thread_rng();
        rng.gen_range(0..len)
    }
}

pub struct SequenceRandomSource {
    picks: Vec<usize>,
    index: usize,
}

impl SequenceRandomSource {
    pub fn new(picks: Vec<usize>) -> Self {
        Self { picks, index: 0 }
    }
}

impl RandomSource for SequenceRandomSource {
    fn pick_index(&mut self, len: usize) -> usize {
        let pick = self.picks[self.index % self.picks.len()];
        self.index += 1;
        pick % len
    }
}

// ============================================================================
// Cell
// ============================================================================

/// One grid square: the unit of ownership and occupancy. Ownership persists
/// after the cursor leaves; the occupied flag only tracks the cursor.
#[derive(Clone, Debug)]
pub struct Cell {
    coordinates: Coordinates,
    owner: Option<PlayerId>,
    power_up: Option<PowerUp>,
    occupied: bool,
}

impl Cell {
    fn new(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            owner: None,
            power_up: None,
            occupied: false,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied
    }

    pub fn has_power_up(&self) -> bool {
        self.power_up.is_some()
    }

    pub fn power_up(&self) -> Option<PowerUp> {
        self.power_up
    }

    pub fn owner(&self) -> Option<PlayerId> {
        self.owner
    }

    fn take_power_up(&mut self) -> Option<PowerUp> {
        self.power_up.take()
    }
}

// ============================================================================
// Grid
// ============================================================================

const NEIGHBOR_OFFSETS: [(i16, i16); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

pub struct Grid {
    rows: i16,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(rows: i16) -> Self {
        let mut cells = Vec::with_capacity((rows * rows) as usize);
        for x in 0..rows {
            for y in 0..rows {
                cells.push(Cell::new(Coordinates::new(x, y)));
            }
        }
        Self { rows, cells }
    }

    pub fn rows(&self) -> i16 {
        self.rows
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell at the given coordinates, or `None` out of range. Geometry scans
    /// rely on this filter to drop their out-of-range candidates.
    pub fn cell_at(&self, x: i16, y: i16) -> Option<&Cell> {
        self.index_of(x, y).map(|idx| &self.cells[idx])
    }

    fn index_of(&self, x: i16, y: i16) -> Option<usize> {
        if x < 0 || x >= self.rows || y < 0 || y >= self.rows {
            return None;
        }
        Some((x * self.rows + y) as usize)
    }

    fn existing(&self, x: i16, y: i16) -> Option<Coordinates> {
        self.cell_at(x, y).map(Cell::coordinates)
    }

    /// All cells sharing the player's row, then all sharing its column, as
    /// four directional scans. The down and right scans start on the player's
    /// own cell and overshoot by one; the overshoot is filtered out.
    pub fn row_and_column_of(&self, player: &Player) -> Vec<Coordinates> {
        let Coordinates { x, y } = player.coordinates;
        let mut cells = Vec::new();
        cells.extend((0..x).filter_map(|row| self.existing(row, y)));
        cells.extend((0..=self.rows - x).filter_map(|step| self.existing(x + step, y)));
        cells.extend((0..y).filter_map(|col| self.existing(x, col)));
        cells.extend((0..=self.rows - y).filter_map(|step| self.existing(x, y + step)));
        cells
    }

    /// The four orthogonal neighbors that exist on the grid.
    pub fn cross_zone_around(&self, player: &Player) -> Vec<Coordinates> {
        let Coordinates { x, y } = player.coordinates;
        [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)]
            .into_iter()
            .filter_map(|(cx, cy)| self.existing(cx, cy))
            .collect()
    }

    /// One directional scan, selected by the player's most recent move.
    ///
    /// # Panics
    /// Panics if the player has not moved yet. Power-ups are only ever
    /// collected by moving, so a direction is always recorded by then.
    pub fn cells_in_direction(&self, player: &Player) -> Vec<Coordinates> {
        let Coordinates { x, y } = player.coordinates;
        let direction = player
            .current_direction
            .expect("line queried before the player made any move");
        match direction {
            Direction::Up => (0..x).filter_map(|row| self.existing(row, y)).collect(),
            Direction::Down => (0..=self.rows - x)
                .filter_map(|step| self.existing(x + step, y))
                .collect(),
            Direction::Left => (0..y).filter_map(|col| self.existing(x, col)).collect(),
            Direction::Right => (0..=self.rows - y)
                .filter_map(|step| self.existing(x, y + step))
                .collect(),
        }
    }

    /// The 8-connected neighborhood around the player.
    pub fn zone_around(&self, player: &Player) -> Vec<Coordinates> {
        let Coordinates { x, y } = player.coordinates;
        NEIGHBOR_OFFSETS
            .into_iter()
            .filter_map(|(dx, dy)| self.existing(x + dx, y + dy))
            .collect()
    }

    /// Movement resolution: free the mover's current cell (keeping its
    /// ownership), then occupy and take ownership of the destination.
    /// Returns the power-up found there, if any.
    pub fn player_move_to(
        &mut self,
        players: &mut [Player],
        mover: PlayerId,
        dest: Coordinates,
    ) -> Option<PowerUp> {
        if let Some(current) = self
            .cells
            .iter_mut()
            .find(|cell| cell.owner == Some(mover) && cell.occupied)
        {
            current.occupied = false;
        }

        self.set_owner(players, dest, mover);

        let idx = self.index_of(dest.x, dest.y)?;
        let cell = &mut self.cells[idx];
        cell.occupied = true;
        players[mover.0].coordinates = dest;
        cell.take_power_up()
    }

    /// Ownership transfer. A previous owner, the mover included, is demoted
    /// by one point and loses the cell's occupied mark; the caller is
    /// responsible for any compensating score bump.
    pub fn set_owner(&mut self, players: &mut [Player], at: Coordinates, owner: PlayerId) {
        let Some(idx) = self.index_of(at.x, at.y) else {
            return;
        };
        if let Some(previous) = self.cells[idx].owner {
            self.cells[idx].occupied = false;
            players[previous.0].decrease_score();
        }
        self.cells[idx].owner = Some(owner);
    }

    /// Drops ownership, demoting whoever held it. No-op on unowned cells, so
    /// calling it twice is the same as calling it once.
    pub fn remove_owner(&mut self, players: &mut [Player], at: Coordinates) {
        let Some(idx) = self.index_of(at.x, at.y) else {
            return;
        };
        let Some(previous) = self.cells[idx].owner else {
            return;
        };
        players[previous.0].decrease_score();
        self.cells[idx].owner = None;
    }

    pub fn remove_power_up(&mut self, at: Coordinates) {
        if let Some(idx) = self.index_of(at.x, at.y) {
            self.cells[idx].power_up = None;
        }
    }

    /// Attach the power-up to a uniformly random cell that is neither under a
    /// cursor nor already carrying one. Silently skipped when no such cell
    /// exists.
    pub fn add_power_up(
        &mut self,
        random: &mut dyn RandomSource,
        power_up: PowerUp,
    ) -> Option<Coordinates> {
        let free: Vec<usize> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.occupied && !cell.has_power_up())
            .map(|(idx, _)| idx)
            .collect();
        if free.is_empty() {
            return None;
        }

        let idx = free[random.pick_index(free.len())];
        self.cells[idx].power_up = Some(power_up);
        Some(self.cells[idx].coordinates)
    }
}

// ============================================================================
// Power-up Resolution
// ============================================================================

/// Claim one cell for the actor: skipped when the cell is missing, already
/// the actor's, or under any cursor. A claim strips any power-up sitting on
/// the cell and is worth one point per cell.
pub fn claim_cell(grid: &mut Grid, players: &mut [Player], actor: PlayerId, at: Coordinates) {
    let Some(cell) = grid.cell_at(at.x, at.y) else {
        return;
    };
    if cell.owner() == Some(actor) || cell.is_occupied() {
        return;
    }

    grid.set_owner(players, at, actor);
    grid.remove_power_up(at);
    players[actor.0].increase_score();
}

/// Clear one cell: skipped when the cell is missing or under a cursor.
/// Whoever owned it is demoted; any power-up on it is stripped.
pub fn clear_cell(grid: &mut Grid, players: &mut [Player], at: Coordinates) {
    let Some(cell) = grid.cell_at(at.x, at.y) else {
        return;
    };
    if cell.is_occupied() {
        return;
    }

    grid.remove_owner(players, at);
    grid.remove_power_up(at);
}

/// Resolve a collected power-up: query the geometry from the actor's current
/// position, then batch-apply its claim or clear over the result.
pub fn unleash_power_up(
    grid: &mut Grid,
    players: &mut [Player],
    actor: PlayerId,
    power_up: PowerUp,
) {
    let targets = match power_up.geometry() {
        Geometry::Zone => grid.zone_around(&players[actor.0]),
        Geometry::RowAndColumn => grid.row_and_column_of(&players[actor.0]),
        Geometry::Cross => grid.cross_zone_around(&players[actor.0]),
        Geometry::Line => grid.cells_in_direction(&players[actor.0]),
    };

    match power_up.effect() {
        Effect::Claim => {
            for at in targets {
                claim_cell(grid, players, actor, at);
            }
        }
        Effect::Clear => {
            for at in targets {
                clear_cell(grid, players, at);
            }
        }
    }
}

// ============================================================================
// Player
// ============================================================================

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub color: PlayerColor,
    pub score: u32,
    pub coordinates: Coordinates,
    pub current_direction: Option<Direction>,
    pub keys: KeyBindings,
    pub opponents: Vec<PlayerId>,
    rows: i16,
}

impl Player {
    fn new(
        id: PlayerId,
        color: PlayerColor,
        keys: KeyBindings,
        start: Coordinates,
        rows: i16,
    ) -> Self {
        Self {
            id,
            color,
            score: START_SCORE,
            coordinates: start,
            current_direction: None,
            keys,
            opponents: Vec::new(),
            rows,
        }
    }

    /// Registers opponents by appending. The roster initializer calls this
    /// exactly once per player; calling it again would duplicate entries.
    pub fn set_opponents(&mut self, opponents: &[PlayerId]) {
        self.opponents.extend_from_slice(opponents);
    }

    pub fn increase_score(&mut self) {
        self.score += 1;
    }

    pub fn decrease_score(&mut self) {
        if self.score == 0 {
            return;
        }
        self.score -= 1;
    }

    /// Candidate coordinates one step away, or `None` when the step would
    /// leave the grid. Movement clamps at the edges, it never wraps.
    pub fn step(&self, direction: Direction) -> Option<Coordinates> {
        let (dx, dy) = direction.delta();
        let candidate = Coordinates::new(self.coordinates.x + dx, self.coordinates.y + dy);
        let inside = candidate.x >= 0
            && candidate.x < self.rows
            && candidate.y >= 0
            && candidate.y < self.rows;
        inside.then_some(candidate)
    }
}

/// The two-player roster: player one on the arrow keys starting bottom-right,
/// player two on WASD starting top-left.
pub fn init_players(rows: i16) -> Vec<Player> {
    let mut player_one = Player::new(
        PlayerId(0),
        PlayerColor::Pink,
        KeyBindings::arrows(),
        Coordinates::new(rows - 1, rows - 1),
        rows,
    );
    let mut player_two = Player::new(
        PlayerId(1),
        PlayerColor::Green,
        KeyBindings::wasd(),
        Coordinates::new(0, 0),
        rows,
    );

    player_one.set_opponents(&[player_two.id]);
    player_two.set_opponents(&[player_one.id]);

    vec![player_one, player_two]
}

// ============================================================================
// Game
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GamePhase {
    Ready,
    Playing,
    Finished,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RoundOutcome {
    Winner(PlayerId),
    Draw,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameEvent {
    PlayerMoved(PlayerId),
    PowerUpSpawned {
        at: Coordinates,
        power_up: PowerUp,
    },
    PowerUpCollected {
        player: PlayerId,
        power_up: PowerUp,
    },
    RoundFinished(RoundOutcome),
    RoundRestarted,
}

pub struct Game {
    pub grid: Grid,
    pub players: Vec<Player>,
    pub phase: GamePhase,
    pub time_left: u32,
    config: GameConfig,
    random: Box<dyn RandomSource>,
    events: Vec<GameEvent>,
}

impl Game {
    pub fn new() -> Self {
        Self::with_random(GameConfig::default(), Box::new(ThreadRngSource))
    }

    pub fn with_config(config: GameConfig) -> Self {
        Self::with_random(config, Box::new(ThreadRngSource))
    }

    pub fn with_random(config: GameConfig, random: Box<dyn RandomSource>) -> Self {
        let mut game = Self {
            grid: Grid::new(config.rows),
            players: Vec::new(),
            phase: GamePhase::Ready,
            time_left: config.round_secs,
            config,
            random,
            events: Vec::new(),
        };
        game.seat_players();
        game
    }

    /// Builds the roster and walks each player onto their start cell. Seating
    /// claims the cell without the move bonus, so scores stay at the start
    /// value.
    fn seat_players(&mut self) {
        self.players = init_players(self.config.rows);
        for idx in 0..self.players.len() {
            let start = self.players[idx].coordinates;
            self.grid.player_move_to(&mut self.players, PlayerId(idx), start);
        }
    }

    pub fn player(&self, id: PlayerId) -> &Player {
        &self.players[id.0]
    }

    pub fn start(&mut self) {
        if self.phase == GamePhase::Ready {
            self.phase = GamePhase::Playing;
        }
    }

    /// Offers the key to every player; each one answers only its own
    /// bindings.
    pub fn handle_key(&mut self, key: KeyCode) {
        if self.phase != GamePhase::Playing {
            return;
        }
        for idx in 0..self.players.len() {
            self.try_move(idx, key);
        }
    }

    fn try_move(&mut self, mover: usize, key: KeyCode) {
        let Some(direction) = self.players[mover].keys.direction_for(key) else {
            return;
        };
        let Some(dest) = self.players[mover].step(direction) else {
            return;
        };

        // A move onto an opponent's cursor is rejected outright.
        let blocked = self.players[mover]
            .opponents
            .iter()
            .any(|opponent| self.players[opponent.0].coordinates == dest);
        if blocked {
            return;
        }

        self.players[mover].current_direction = Some(direction);
        let collected = self.grid.player_move_to(&mut self.players, PlayerId(mover), dest);
        if let Some(power_up) = collected {
            self.events.push(GameEvent::PowerUpCollected {
                player: PlayerId(mover),
                power_up,
            });
            unleash_power_up(&mut self.grid, &mut self.players, PlayerId(mover), power_up);
        }

        self.players[mover].increase_score();
        self.events.push(GameEvent::PlayerMoved(PlayerId(mover)));
    }

    /// Picks a random kind and drops it on a random free cell. Driven by the
    /// host on its own cadence, independently of the countdown.
    pub fn spawn_power_up(&mut self) {
        if self.phase != GamePhase::Playing {
            return;
        }
        let power_up = PowerUp::ALL[self.random.pick_index(PowerUp::ALL.len())];
        if let Some(at) = self.grid.add_power_up(&mut *self.random, power_up) {
            self.events.push(GameEvent::PowerUpSpawned { at, power_up });
        }
    }

    /// One countdown step. The round finishes exactly once, when the clock
    /// hits zero.
    pub fn tick_second(&mut self) {
        if self.phase != GamePhase::Playing {
            return;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.phase = GamePhase::Finished;
            self.events.push(GameEvent::RoundFinished(self.outcome()));
        }
    }

    /// Highest score wins; identical scores across the roster are a draw.
    pub fn outcome(&self) -> RoundOutcome {
        let all_equal = self
            .players
            .iter()
            .all(|player| player.score == self.players[0].score);
        if all_equal {
            return RoundOutcome::Draw;
        }
        let winner = self
            .players
            .iter()
            .max_by_key(|player| player.score)
            .map(|player| player.id)
            .unwrap_or(PlayerId(0));
        RoundOutcome::Winner(winner)
    }

    /// Rebuilds grid, roster and clock in place and goes straight back to
    /// playing.
    pub fn restart(&mut self) {
        self.grid = Grid::new(self.config.rows);
        self.seat_players();
        self.time_left = self.config.round_secs;
        self.phase = GamePhase::Playing;
        self.events.clear();
        self.events.push(GameEvent::RoundRestarted);
    }

    /// Takes and clears all pending events
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

pub mod test_helpers {
    use super::*;

    pub fn deterministic_game(rows: i16) -> Game {
        game_with_picks(rows, vec![0])
    }

    pub fn game_with_picks(rows: i16, picks: Vec<usize>) -> Game {
        Game::with_random(
            GameConfig {
                rows,
                round_secs: DEFAULT_ROUND_SECS,
            },
            Box::new(SequenceRandomSource::new(picks)),
        )
    }

    pub fn started_game(rows: i16) -> Game {
        let mut game = deterministic_game(rows);
        game.start();
        game
    }
}
