//! Call-data encoding for the fixed game contract ABI
//!
//! Functions: `startGame(uint256,bytes32[],uint8[])`,
//! `play(uint256,uint8,bytes32)`, `getBoard(uint256)` returning
//! `(bytes32 board, uint32 nextMoveNumber)`.

use crate::error::{ClientError, ClientResult};

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Bytes, H256, U256};
use ethers::utils::id;

const START_GAME_SIG: &str = "startGame(uint256,bytes32[],uint8[])";
const PLAY_SIG: &str = "play(uint256,uint8,bytes32)";
const GET_BOARD_SIG: &str = "getBoard(uint256)";

fn call_data(signature: &str, tokens: &[Token]) -> Bytes {
    let mut data = id(signature).to_vec();
    data.extend(abi::encode(tokens));
    data.into()
}

/// Encode a `startGame` call
pub fn encode_start_game(game_id: U256, boards: &[H256], moves: &[u8]) -> Bytes {
    let tokens = [
        Token::Uint(game_id),
        Token::Array(
            boards
                .iter()
                .map(|board| Token::FixedBytes(board.as_bytes().to_vec()))
                .collect(),
        ),
        Token::Array(
            moves
                .iter()
                .map(|mv| Token::Uint(U256::from(*mv)))
                .collect(),
        ),
    ];
    call_data(START_GAME_SIG, &tokens)
}

/// Encode a `play` call
pub fn encode_play(game_id: U256, game_move: u8, result_board: H256) -> Bytes {
    let tokens = [
        Token::Uint(game_id),
        Token::Uint(U256::from(game_move)),
        Token::FixedBytes(result_board.as_bytes().to_vec()),
    ];
    call_data(PLAY_SIG, &tokens)
}

/// Encode a `getBoard` call
pub fn encode_get_board(game_id: U256) -> Bytes {
    call_data(GET_BOARD_SIG, &[Token::Uint(game_id)])
}

/// Decode the `getBoard` return value
pub fn decode_board(raw: &[u8]) -> ClientResult<(H256, u32)> {
    let tokens = abi::decode(&[ParamType::FixedBytes(32), ParamType::Uint(32)], raw)
        .map_err(|e| ClientError::Contract(format!("Malformed getBoard response: {}", e)))?;

    match (&tokens[0], &tokens[1]) {
        (Token::FixedBytes(board), Token::Uint(next_move)) => {
            Ok((H256::from_slice(board), next_move.as_u32()))
        }
        _ => Err(ClientError::Contract(
            "Unexpected getBoard return shape".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_game_selector_and_game_id_word() {
        let game_id = U256::from(42u64);
        let data = encode_start_game(game_id, &[H256::repeat_byte(0x01)], &[3, 5]);

        assert_eq!(&data[0..4], id(START_GAME_SIG).as_slice());
        // First argument word is the game id
        assert_eq!(U256::from_big_endian(&data[4..36]), game_id);
    }

    #[test]
    fn play_encodes_three_words() {
        let data = encode_play(U256::from(7u64), 4, H256::repeat_byte(0xbe));

        assert_eq!(&data[0..4], id(PLAY_SIG).as_slice());
        assert_eq!(data.len(), 4 + 3 * 32);
        assert_eq!(U256::from_big_endian(&data[4..36]), U256::from(7u64));
        assert_eq!(U256::from_big_endian(&data[36..68]), U256::from(4u64));
        assert_eq!(H256::from_slice(&data[68..100]), H256::repeat_byte(0xbe));
    }

    #[test]
    fn get_board_is_selector_plus_one_word() {
        let data = encode_get_board(U256::from(9u64));
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[0..4], id(GET_BOARD_SIG).as_slice());
    }

    #[test]
    fn decode_board_reads_contract_return() {
        let board = H256::repeat_byte(0x77);
        let raw = abi::encode(&[
            Token::FixedBytes(board.as_bytes().to_vec()),
            Token::Uint(U256::from(12u64)),
        ]);

        let (decoded_board, next_move) = decode_board(&raw).unwrap();
        assert_eq!(decoded_board, board);
        assert_eq!(next_move, 12);
    }

    #[test]
    fn decode_board_rejects_garbage() {
        assert!(matches!(
            decode_board(&[0x01, 0x02]),
            Err(ClientError::Contract(_))
        ));
    }
}
