mod support;

use starfall_core::entities::Position;
use starfall_core::game_loop::GameEvent;
use starfall_server::protocol::ServerMessage;

async fn login(ws: &mut support::Ws, username: &str) -> u64 {
    let text = format!(r#"{{"type":"Login","data":{{"username":"{username}"}}}}"#);
    support::send_text(ws, &text).await;
    support::wait_for(ws, |msg| match msg {
        ServerMessage::LoginSuccess { player_id, .. } => Some(player_id),
        _ => None,
    })
    .await
}

#[tokio::test]
async fn test_login_then_move_shows_in_world_update() {
    let mut ws = support::connect("mover").await;
    let player_id = login(&mut ws, "Ana").await;

    support::send_text(
        &mut ws,
        r#"{"type":"Action","data":{"type":"Move","data":{"to":{"x":7,"y":-3,"z":1}}}}"#,
    )
    .await;

    let to = support::wait_for(&mut ws, |msg| match msg {
        ServerMessage::WorldUpdate(update) => update.events.events.into_iter().find_map(|e| {
            match e {
                GameEvent::PlayerMoved { player, to } if player == player_id => Some(to),
                _ => None,
            }
        }),
        _ => None,
    })
    .await;
    assert_eq!(to, Position::new(7, -3, 1));
}

#[tokio::test]
async fn test_world_updates_carry_logged_in_player() {
    let mut ws = support::connect("watcher").await;
    let player_id = login(&mut ws, "Bo").await;

    let update = support::wait_for(&mut ws, |msg| match msg {
        ServerMessage::WorldUpdate(update)
            if update.snapshot.players.iter().any(|p| p.id == player_id) =>
        {
            Some(update)
        }
        _ => None,
    })
    .await;
    assert_eq!(update.snapshot.tick, update.events.tick);
    assert!(!update.snapshot.planets.is_empty());
}

#[tokio::test]
async fn test_action_before_login_is_refused() {
    let mut ws = support::connect("anonymous").await;
    support::send_text(&mut ws, r#"{"type":"Action","data":{"type":"LeaveFaction"}}"#).await;

    let message = support::wait_for(&mut ws, |msg| match msg {
        ServerMessage::Error { message } => Some(message),
        _ => None,
    })
    .await;
    assert_eq!(message, "Login required");
}

#[tokio::test]
async fn test_malformed_message_reports_error() {
    let mut ws = support::connect("garbled").await;
    support::send_text(&mut ws, "not json").await;

    let message = support::wait_for(&mut ws, |msg| match msg {
        ServerMessage::Error { message } => Some(message),
        _ => None,
    })
    .await;
    assert!(message.starts_with("Invalid message"));
}

#[tokio::test]
async fn test_duplicate_client_id_is_rejected() {
    let mut first = support::connect("twin").await;
    login(&mut first, "Cy").await;

    let mut second = support::connect("twin").await;
    let message = support::wait_for(&mut second, |msg| match msg {
        ServerMessage::Error { message } => Some(message),
        _ => None,
    })
    .await;
    assert_eq!(message, "Client id already connected");
}
